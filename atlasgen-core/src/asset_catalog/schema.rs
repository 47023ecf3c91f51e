use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolution variant of an image asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scale {
    One,
    Two,
    Three,
}

impl Scale {
    /// Scales that get an atlas. 1x has no base-resolution support.
    pub const PACKED: [Scale; 2] = [Scale::Two, Scale::Three];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1x" => Some(Scale::One),
            "2x" => Some(Scale::Two),
            "3x" => Some(Scale::Three),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scale::One => "1x",
            Scale::Two => "2x",
            Scale::Three => "3x",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Contents.json` of one `.imageset` bundle. Only the fields the generator
/// reads are modelled; anything else in the file is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleContents {
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageEntry {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub scale: Option<String>,
    #[serde(default)]
    pub idiom: Option<String>,
}

impl ImageEntry {
    pub fn scale(&self) -> Option<Scale> {
        self.scale.as_deref().and_then(Scale::parse)
    }

    /// Filename with empty strings treated as unset.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub author: String,
    pub version: u32,
}

impl Default for CatalogInfo {
    fn default() -> Self {
        Self { author: "xcode".to_string(), version: 1 }
    }
}

/// One entry of a `.dataset` bundle descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEntry {
    pub filename: String,
    pub idiom: String,
    #[serde(rename = "universal-type-identifier")]
    pub type_identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetContents {
    pub data: Vec<DataEntry>,
    pub info: CatalogInfo,
}

impl DatasetContents {
    pub fn json(filename: impl Into<String>) -> Self {
        Self {
            data: vec![DataEntry {
                filename: filename.into(),
                idiom: "universal".to_string(),
                type_identifier: "public.json".to_string(),
            }],
            info: CatalogInfo::default(),
        }
    }
}
