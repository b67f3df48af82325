//! v2/v3 path resolution, mirroring `common.py`'s module-level `Z2ABS`/`Z3ABS`
//! constants and path helpers, in the `from_env()` idiom the teacher uses for
//! its own connection settings (`BahnApiCredentials::env`,
//! `DatabaseConnectionInfo::from_env`).

use std::env;
use std::path::{Path, PathBuf};

use model::ConvertError;

/// The two data-root directories this conversion runs against, read once
/// from the environment.
#[derive(Debug, Clone)]
pub struct ZusiPaths {
    pub z2_abs: PathBuf,
    pub z3_abs: PathBuf,
}

impl ZusiPaths {
    pub fn from_env() -> Result<Self, ConvertError> {
        let z2_abs = env_path("ZUSI2_DATAPATH")?;
        let z3_abs = env_path("ZUSI3_DATAPATH")?;
        Ok(ZusiPaths { z2_abs, z3_abs })
    }

    /// All converted output lands under a fixed staging directory inside the
    /// v3 tree, regardless of the input file's own relative location.
    pub fn z2rel_to_z3rel(&self, filename: &str) -> String {
        format!("Temp\\_z2conv\\{filename}")
    }

    pub fn z2rel_to_abs(&self, filename: &str) -> PathBuf {
        windows_rel_to_native(&self.z2_abs, filename)
    }

    pub fn z3rel_to_abs(&self, filename: &str) -> PathBuf {
        windows_rel_to_native(&self.z3_abs, filename)
    }

    /// The inverse of `z2rel_to_abs`: an absolute path under the v2 data root,
    /// rendered as a Windows-style relative path (`os.path.relpath` +
    /// separator swap in the original).
    pub fn abs_to_z2rel(&self, abs: &Path) -> String {
        let rel = abs.strip_prefix(&self.z2_abs).unwrap_or(abs);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\\")
    }
}

fn env_path(var: &'static str) -> Result<PathBuf, ConvertError> {
    env::var(var)
        .map(PathBuf::from)
        .map_err(|_| ConvertError::MissingEnv { var })
}

/// v2 file content stores Windows-style relative paths (`\`-separated)
/// regardless of the host platform; join them onto a root the same way the
/// original does (`os.path.join` + a backslash-to-native separator swap).
fn windows_rel_to_native(root: &Path, rel: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in rel.split('\\') {
        if !part.is_empty() {
            out.push(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> ZusiPaths {
        ZusiPaths {
            z2_abs: PathBuf::from("/data/zusi2"),
            z3_abs: PathBuf::from("/data/zusi3"),
        }
    }

    #[test]
    fn z2rel_to_z3rel_always_lands_in_the_staging_directory() {
        let p = paths();
        assert_eq!(
            p.z2rel_to_z3rel("Strecken\\Foo\\bar.ls"),
            "Temp\\_z2conv\\Strecken\\Foo\\bar.ls"
        );
    }

    #[test]
    fn abs_to_z2rel_renders_windows_style_separators() {
        let p = paths();
        let abs = p.z2_abs.join("Strecken").join("Foo").join("bar.str");
        assert_eq!(p.abs_to_z2rel(&abs), "Strecken\\Foo\\bar.str");
    }

    #[test]
    fn windows_separators_are_converted_to_native_components() {
        let p = paths();
        assert_eq!(
            p.z2rel_to_abs("Strecken\\Foo\\bar.ls"),
            PathBuf::from("/data/zusi2/Strecken/Foo/bar.ls")
        );
        assert_eq!(
            p.z3rel_to_abs("Temp\\_z2conv\\bar.ls3"),
            PathBuf::from("/data/zusi3/Temp/_z2conv/bar.ls3")
        );
    }
}
