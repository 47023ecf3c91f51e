//! Asset catalog descriptors (`Contents.json`) and bundle discovery.

pub mod collect;
pub mod schema;

use std::path::{Path, PathBuf};

use serde_json::Value;

pub use collect::{GroupCollector, Groups, ScalePaths};
pub use schema::{BundleContents, ImageEntry, Scale};

pub const CONTENTS_FILE: &str = "Contents.json";
pub const BUNDLE_SUFFIX: &str = ".imageset";
pub const DEFAULT_GROUP: &str = "Atlas";

/// Load result of a descriptor file. Missing and unparseable files are
/// states, not errors: callers decide what each one means.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Parsed(Value),
    Absent,
    Malformed(String),
}

impl Descriptor {
    pub fn parse_str(s: &str) -> Self {
        match serde_json::from_str::<Value>(s) {
            Ok(v) if v.is_object() => Descriptor::Parsed(v),
            Ok(_) => Descriptor::Malformed("descriptor is not a JSON object".to_string()),
            Err(e) => Descriptor::Malformed(e.to_string()),
        }
    }

    /// Reads `Contents.json` inside `dir`.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::load(contents_path(dir))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => Self::parse_str(&data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Descriptor::Absent,
            Err(e) => Descriptor::Malformed(e.to_string()),
        }
    }

    /// Decodes a parsed descriptor into a typed bundle descriptor.
    pub fn bundle(&self) -> Result<BundleContents, String> {
        match self {
            Descriptor::Parsed(v) => {
                serde_json::from_value(v.clone()).map_err(|e| e.to_string())
            }
            Descriptor::Absent => Err(format!("missing {}", CONTENTS_FILE)),
            Descriptor::Malformed(reason) => Err(reason.clone()),
        }
    }
}

pub fn contents_path<P: AsRef<Path>>(dir: P) -> PathBuf {
    dir.as_ref().join(CONTENTS_FILE)
}

/// True for a path segment naming an image bundle directory.
pub fn is_bundle_segment(segment: &str) -> bool {
    segment.len() > BUNDLE_SUFFIX.len() && segment.ends_with(BUNDLE_SUFFIX)
}

/// Logical image name: the bundle directory name with its suffix stripped.
/// `Icons/Play.imageset/play@2x.png` is named `Play`.
pub fn bundle_name<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .components()
        .rev()
        .filter_map(|c| c.as_os_str().to_str())
        .find(|c| is_bundle_segment(c))
        .and_then(|c| c.strip_suffix(BUNDLE_SUFFIX))
        .map(str::to_string)
}
