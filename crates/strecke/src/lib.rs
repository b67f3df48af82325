//! Converts a Zusi 2 track module (`.str`, v2.3) into a Zusi 3 route module.
//! Ported from `zusi2to3/strecke.py::conv_str`.

mod parse;
mod refs;
mod synth;

use std::path::Path;

use model::Result;
use util::ZusiPaths;
use xmltree::{Document, Element};

pub use parse::ParsedRoute;
pub use synth::RouteState;

/// Converts `path` (an absolute path to a v2 `.str` file) and writes the v3
/// route module into the staging directory under `paths.z3_abs`. Returns the
/// v3-relative output filename and the recursion depth read from the v2
/// file, mirroring `conv_str`'s `(outname_rel, rekursionstiefe)` return
/// value (the latter is only ever consumed by the timetable converter).
pub fn convert_route(paths: &ZusiPaths, path: &Path) -> Result<(String, u32)> {
    let parsed = parse::parse(paths, path)?;

    let state = RouteState {
        elements: &parsed.elements,
        signale: &parsed.signale,
        anonyme_signale: &parsed.anonyme_signale,
        fahrstrsignale: &parsed.fahrstrsignale,
        aufgleispunkte: &parsed.aufgleispunkte,
        signal_order: &parsed.signal_order,
        outname_rel: &parsed.outname_rel,
    };
    let routes = synth::seed_routes(&state);

    let mut strecke = Element::new("Strecke").child(Element::new("Datei").attr("Dateiname", parsed.ls_dateiname.clone()));

    for r#ref in parsed.aufgleis_refs {
        strecke.push_child(r#ref);
    }

    for &elem_nr in &parsed.element_order {
        if let Some(refs) = parsed.extra_refs.get(&elem_nr) {
            for r#ref in refs {
                strecke.push_child(r#ref.clone());
            }
        }
    }
    // Reference points allocated during the predecessor pass (switch-reverse
    // points on convergence) were stashed under the sentinel key `0`, which
    // is never a real element number.
    if let Some(post_refs) = parsed.extra_refs.get(&0) {
        for r#ref in post_refs {
            strecke.push_child(r#ref.clone());
        }
    }

    for &elem_nr in &parsed.element_order {
        strecke.push_child(parsed.str_element_nodes[&elem_nr].clone());
    }

    for route in routes {
        strecke.push_child(route);
    }

    let root = Element::new("Zusi").child(strecke);
    let out_abs = paths.z3rel_to_abs(&parsed.outname_rel);
    log::info!("writing {}", out_abs.display());
    Document::new(root).write_to_file(&out_abs)?;
    log::info!("done");

    Ok((parsed.outname_rel, parsed.rekursionstiefe))
}

/// Scenario fixtures matching spec.md §8 (S1, S2, S3, S6). Each builds a
/// minimal synthetic v2 `.str` file byte-for-byte, field by field, the way
/// `parse::parse` and its sub-parsers read them, and exercises the full
/// `convert_route` pipeline rather than any single internal function.
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write as _;
    use std::path::{Path, PathBuf};

    fn paths(tmp: &tempfile::TempDir) -> ZusiPaths {
        ZusiPaths {
            z2_abs: tmp.path().join("z2"),
            z3_abs: tmp.path().join("z3"),
        }
    }

    fn write_file(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    const EMPTY_LS: &str = "2.3\r\n0\r\n#\r\n";

    /// One combi-signal matrix row (a destination block/track and its own
    /// stop indicator) plus its single pre-signal column's matrix entry.
    struct Row {
        block: &'static str,
        gleis: &'static str,
        row_vmax: i32,
        entry_vmax: i32,
    }

    fn row(block: &'static str, gleis: &'static str, row_vmax: i32, entry_vmax: i32) -> Row {
        Row {
            block,
            gleis,
            row_vmax,
            entry_vmax,
        }
    }

    /// The combi-signal sub-record read by `parse_combi_signal`, always with
    /// a single pre-signal column (`vsig_geschw = [-1]`) shared by every row.
    fn signal_block(block: &str, gleis: &str, rows: &[Row]) -> String {
        let mut s = String::new();
        s.push_str("0\r\n0\r\n0\r\n"); // x1,y1,z1 = 0 -> origin taken from point 2
        s.push_str("0\r\n0\r\n0\r\n"); // rx1,ry1,rz1
        s.push_str("1\r\n0\r\n0\r\n"); // x2,y2,z2
        s.push_str("0\r\n0\r\n0\r\n"); // rx2,ry2,rz2
        s.push_str("#\r\n"); // no signal frames
        s.push_str(&format!("{block}\r\n{gleis}\r\n"));
        s.push_str(&format!("{}\r\n", rows.len() - 1)); // numzeilen - 1
        s.push_str("0\r\n"); // numspalten - 1 = 0 -> one column
        for r in rows {
            s.push_str(&format!("{}\r\n{}\r\n{}\r\n0\r\n0\r\n", r.block, r.gleis, r.row_vmax));
        }
        s.push_str("-1\r\n"); // vsig_geschw[0]
        s.push_str("0\r\n"); // Aus bei Hp0
        for r in rows {
            s.push_str(&format!("0\r\n{}\r\n0\r\n0\r\n0\r\n0\r\n", r.entry_vmax));
        }
        s.push_str("0\r\n0\r\n0\r\n0\r\n0\r\n"); // substitute signal aspect,vmax,id,er1,er2
        s.push_str("0\r\n0\r\n"); // reserved, probability
        s.push_str("#\r\n"); // no pre-signal elements
        s.push_str("0\r\n"); // reserved
        s
    }

    /// One element record read by the main per-element loop. `successors` is
    /// zero-padded to three; `register` of `0` means "none yet assigned".
    fn element(
        nr: u32,
        successors: [u32; 3],
        event_code: u32,
        register: u32,
        signal: Option<(&str, &str, &[Row])>,
    ) -> String {
        let mut s = String::new();
        s.push_str(&format!("{nr}\r\n"));
        s.push_str("0\r\n"); // km
        s.push_str("+\r\n"); // direction
        s.push_str("#\r\n"); // scenery label
        s.push_str(&format!("{event_code}\r\n"));
        s.push_str("0\r\n0\r\n0\r\n"); // g
        s.push_str("0\r\n0\r\n0\r\n"); // b
        s.push_str("0\r\n"); // Ueberh
        for succ in successors {
            s.push_str(&format!("{succ}\r\n"));
        }
        s.push_str("0\r\n"); // vmax
        for _ in 0..4 {
            s.push_str("0\r\n");
        }
        s.push_str("#\r\n"); // no aux signal
        match signal {
            Some((block, gleis, rows)) => s.push_str(&signal_block(block, gleis, rows)),
            None => s.push_str("#\r\n"),
        }
        s.push_str(&format!("{register}\r\n"));
        s
    }

    fn header(ls_datei: &str) -> String {
        let mut s = String::new();
        s.push_str("2.3\r\n");
        s.push_str("Ersteller\r\n");
        s.push_str("Lizenz\r\n");
        s.push_str("0\r\n"); // rekursionstiefe
        s.push_str("#\r\n"); // skip_until_hash #1
        s.push_str("#\r\n"); // skip_until_hash #2
        s.push_str("0\r\n"); // discarded line before the scenery filename
        s.push_str(&format!("{ls_datei}\r\n"));
        s.push_str("#\r\n"); // no staging points
        s.push_str("#\r\n"); // skip_until_hash after the staging loop
        s
    }

    fn write_route(tmp: &tempfile::TempDir, name: &str, body: &str) -> (ZusiPaths, PathBuf) {
        let paths = paths(tmp);
        write_file(&paths.z2_abs.join("empty.ls"), EMPTY_LS);
        let str_path = paths.z2_abs.join("Strecken").join(name);
        write_file(&str_path, &format!("{}{body}", header("empty.ls")));
        (paths, str_path)
    }

    #[test]
    fn s1_trivial_chain_produces_a_single_route_to_the_target_signal() {
        let tmp = tempfile::tempdir().unwrap();
        let body = element(1, [2, 0, 0], 0, 0, Some(("A", "1", &[row("B", "1", 0, 100)])))
            + &element(2, [3, 0, 0], 0, 0, None)
            + &element(3, [0, 0, 0], 0, 0, Some(("B", "1", &[row("X", "1", 0, -1)])));
        let (paths, str_path) = write_route(&tmp, "s1.str", &body);

        let (outname_rel, _) = convert_route(&paths, &str_path).unwrap();
        let xml = std::fs::read_to_string(paths.z3rel_to_abs(&outname_rel)).unwrap();

        assert_eq!(xml.matches("<Fahrstrasse").count(), 1);
        assert!(xml.contains(r#"FahrstrName="A 1 -> B 1""#));
        assert!(!xml.contains("FahrstrWeiche"));
    }

    #[test]
    fn s2_branch_produces_two_routes_with_a_forward_switch_reference() {
        let tmp = tempfile::tempdir().unwrap();
        let body = element(
            1,
            [2, 3, 0],
            0,
            0,
            Some(("A", "1", &[row("B", "1", 0, 100), row("C", "1", 0, 100)])),
        ) + &element(2, [0, 0, 0], 0, 0, Some(("B", "1", &[row("X", "1", 0, -1)])))
            + &element(3, [0, 0, 0], 0, 0, Some(("C", "1", &[row("X", "1", 0, -1)])));
        let (paths, str_path) = write_route(&tmp, "s2.str", &body);

        let (outname_rel, _) = convert_route(&paths, &str_path).unwrap();
        let xml = std::fs::read_to_string(paths.z3rel_to_abs(&outname_rel)).unwrap();

        assert_eq!(xml.matches("<Fahrstrasse").count(), 2);
        assert!(xml.contains(r#"FahrstrName="A 1 -> B 1""#));
        assert!(xml.contains(r#"FahrstrName="A 1 -> C 1""#));
        assert!(xml.contains(r#"<FahrstrWeiche FahrstrWeichenlage="1" Ref="13">"#));
        assert!(xml.contains(r#"FahrstrWeichenlage="2""#));
    }

    #[test]
    fn s3_release_point_gets_a_partial_release_and_a_downstream_full_release() {
        let tmp = tempfile::tempdir().unwrap();
        let body = element(2, [5, 0, 0], 0, 0, Some(("A", "1", &[row("B", "1", 0, 100)])))
            + &element(5, [9, 0, 0], 3002, 100, None)
            + &element(9, [10, 0, 0], 0, 0, Some(("B", "1", &[row("X", "1", 0, -1)])))
            + &element(10, [0, 0, 0], 3002, 101, None);
        let (paths, str_path) = write_route(&tmp, "s3.str", &body);

        let (outname_rel, _) = convert_route(&paths, &str_path).unwrap();
        let xml = std::fs::read_to_string(paths.z3rel_to_abs(&outname_rel)).unwrap();

        assert!(xml.contains(r#"<FahrstrTeilaufloesung Ref="55">"#));
        assert!(xml.contains(r#"<FahrstrAufloesung Ref="105">"#));
    }

    #[test]
    fn s6_release_marker_without_a_register_gets_one_synthesized() {
        let tmp = tempfile::tempdir().unwrap();
        let body = element(7, [0, 0, 0], 3002, 0, None);
        let (paths, str_path) = write_route(&tmp, "s6.str", &body);

        let (outname_rel, _) = convert_route(&paths, &str_path).unwrap();
        let xml = std::fs::read_to_string(paths.z3rel_to_abs(&outname_rel)).unwrap();

        assert!(xml.contains(r#"<ReferenzElemente ReferenzNr="72" StrElement="7" RefTyp="2" StrNorm="1"/>"#));
        assert!(xml.contains(r#"Reg="20000""#));
    }
}
