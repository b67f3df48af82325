//! Ambient helpers shared across the conversion pipeline: the legacy text
//! reader, v2/v3 path resolution, and the geometry used when re-centering
//! linked scenery and signal frames.

pub mod geo;
pub mod paths;
pub mod reader;

pub use paths::ZusiPaths;
pub use reader::LegacyReader;
