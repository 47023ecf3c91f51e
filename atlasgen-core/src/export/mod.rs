//! Output bundles: the packed PNG in an `.imageset` and its frame map in a
//! `.dataset`, both with Xcode-style `Contents.json` descriptors.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde_json::{json, Value};
use thiserror::Error;

use crate::asset_catalog::collect::bundle_dir_name;
use crate::asset_catalog::schema::{CatalogInfo, DatasetContents};
use crate::asset_catalog::{contents_path, Descriptor, Scale};
use crate::sprite_pack::FrameMap;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {}", .path.display(), .source)]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot encode {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError {
    let path = path.to_path_buf();
    move |source| ExportError::Io { path, source }
}

/// `<group>@<scale>.png`
pub fn atlas_file_name(group: &str, scale: Scale) -> String {
    format!("{}@{}.png", group, scale)
}

/// `<group>@<scale>.dataset`
pub fn dataset_dir_name(group: &str, scale: Scale) -> String {
    format!("{}@{}.dataset", group, scale)
}

/// Descriptor for a fresh atlas bundle: one universal entry per scale.
pub fn default_imageset_contents() -> Value {
    let info = CatalogInfo::default();
    json!({
        "images": [
            { "idiom": "universal", "scale": "1x" },
            { "idiom": "universal", "scale": "2x" },
            { "idiom": "universal", "scale": "3x" }
        ],
        "info": { "author": info.author, "version": info.version }
    })
}

/// Points the `scale` entry of an imageset descriptor at `filename`.
/// Returns false when the descriptor has no entry for that scale.
fn set_scale_filename(contents: &mut Value, scale: Scale, filename: &str) -> bool {
    let Some(images) = contents.get_mut("images").and_then(Value::as_array_mut) else {
        return false;
    };
    let entry = images
        .iter_mut()
        .find(|e| e.get("scale").and_then(Value::as_str) == Some(scale.as_str()));
    match entry.and_then(Value::as_object_mut) {
        Some(obj) => {
            obj.insert("filename".to_string(), Value::String(filename.to_string()));
            true
        }
        None => false,
    }
}

/// Merges `filename` for `scale` into the imageset descriptor at `dir`,
/// starting from the default descriptor when there is no usable one.
pub fn imageset_contents(dir: &Path, scale: Scale, filename: &str) -> Value {
    if let Descriptor::Parsed(mut existing) = Descriptor::load_dir(dir) {
        if set_scale_filename(&mut existing, scale, filename) {
            return existing;
        }
        log::debug!("replacing imageset descriptor in {} without a {} entry", dir.display(), scale);
    }
    let mut contents = default_imageset_contents();
    set_scale_filename(&mut contents, scale, filename);
    contents
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|source| ExportError::Json { path: path.to_path_buf(), source })?;
    fs::write(path, text).map_err(io_err(path))
}

/// Writes `<out>/<group>.imageset/<group>@<scale>.png` and its descriptor.
pub fn write_atlas_bundle(out: &Path, group: &str, scale: Scale, atlas: &RgbaImage) -> Result<PathBuf, ExportError> {
    let dir = out.join(bundle_dir_name(group));
    fs::create_dir_all(&dir).map_err(io_err(&dir))?;

    let filename = atlas_file_name(group, scale);
    let png = dir.join(&filename);
    atlas.save(&png).map_err(|source| ExportError::Image { path: png.clone(), source })?;

    let contents = imageset_contents(&dir, scale, &filename);
    write_json(&contents_path(&dir), &contents)?;
    Ok(png)
}

/// Writes `<out>/<group>@<scale>.dataset/<group>.json` and its descriptor.
pub fn write_frame_bundle(out: &Path, group: &str, scale: Scale, frames: &FrameMap) -> Result<PathBuf, ExportError> {
    let dir = out.join(dataset_dir_name(group, scale));
    fs::create_dir_all(&dir).map_err(io_err(&dir))?;

    let filename = format!("{}.json", group);
    let data = dir.join(&filename);
    write_json(&data, frames)?;
    write_json(&contents_path(&dir), &DatasetContents::json(filename))?;
    Ok(data)
}

/// Copies the catalog root descriptor into an output root.
pub fn copy_root_contents(input: &Path, out: &Path) -> Result<(), ExportError> {
    let from = contents_path(input);
    let to = contents_path(out);
    fs::copy(&from, &to).map_err(io_err(&from))?;
    Ok(())
}
