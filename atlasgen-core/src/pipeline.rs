//! One generator run: gate, collect, group, pack and write every
//! (scale, group) pair, then swap the staged outputs into place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::asset_catalog::{GroupCollector, Scale};
use crate::export;
use crate::sprite_pack::{AtlasPacker, MAX_ATLAS_EDGE};

/// Name of the directory the positional paths are resolved in by default.
pub const RESOURCES_DIR: &str = "resources";

#[derive(Debug, Clone)]
pub struct Config {
    /// Source catalog root (`<name>.xcassets`).
    pub input: PathBuf,
    /// Output catalog for the packed atlas bundles.
    pub atlas_out: PathBuf,
    /// Output catalog for the frame-map data bundles.
    pub data_out: PathBuf,
    pub max_edge: u32,
    /// Rebuild even when the input is marked with `customVersion`.
    pub force: bool,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>, atlas_out: impl Into<PathBuf>, data_out: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            atlas_out: atlas_out.into(),
            data_out: data_out.into(),
            max_edge: MAX_ATLAS_EDGE,
            force: false,
        }
    }

    /// Resolves the three catalog paths against `anchor`. Absolute paths are
    /// kept as they are.
    pub fn anchored(mut self, anchor: &Path) -> Self {
        self.input = anchor.join(&self.input);
        self.atlas_out = anchor.join(&self.atlas_out);
        self.data_out = anchor.join(&self.data_out);
        self
    }
}

/// The working directory itself when it is the resources directory,
/// otherwise its `resources` child.
pub fn resources_anchor(cwd: &Path) -> PathBuf {
    if cwd.file_name().map_or(false, |n| n == RESOURCES_DIR) {
        cwd.to_path_buf()
    } else {
        cwd.join(RESOURCES_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedAtlas {
    pub group: String,
    pub scale: Scale,
    pub images: usize,
    pub edge: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAtlas {
    pub group: String,
    pub scale: Scale,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Input was marked as already built; nothing was touched.
    pub up_to_date: bool,
    pub packed: Vec<PackedAtlas>,
    pub skipped: Vec<SkippedAtlas>,
}

/// An output root being built next to its final location.
struct Staged {
    dir: TempDir,
    dest: PathBuf,
}

impl Staged {
    fn new(dest: &Path) -> Result<Self> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).with_context(|| format!("cannot create {}", parent.display()))?;
        let dir = tempfile::Builder::new()
            .prefix(".atlasgen-")
            .tempdir_in(&parent)
            .with_context(|| format!("cannot stage output in {}", parent.display()))?;
        Ok(Self { dir, dest: dest.to_path_buf() })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `.<name>.old` next to the destination.
    fn aside_path(&self) -> PathBuf {
        self.dest.with_file_name(format!(
            ".{}.old",
            self.dest.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ))
    }
}

/// Lexically equal, or the same directory once the parents are resolved.
/// Destinations need not exist yet.
fn same_location(a: &Path, b: &Path) -> bool {
    fn resolve(p: &Path) -> Option<PathBuf> {
        let parent = match p.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Some(fs::canonicalize(parent).ok()?.join(p.file_name()?))
    }
    a == b || matches!((resolve(a), resolve(b)), (Some(x), Some(y)) if x == y)
}

/// Swaps every staged root into place as one step: all previous outputs are
/// moved aside first, then all staged trees renamed in. Any failure puts
/// every destination back the way it was.
fn commit_all(stages: &[Staged]) -> Result<()> {
    let mut aside: Vec<(&Path, PathBuf)> = Vec::new();
    for stage in stages {
        let old = stage.aside_path();
        if old.exists() {
            if let Err(e) = fs::remove_dir_all(&old) {
                let err = anyhow::Error::new(e).context(format!("cannot remove {}", old.display()));
                return Err(rollback(&[], &aside, err));
            }
        }
        if stage.dest.exists() {
            if let Err(e) = fs::rename(&stage.dest, &old) {
                let err = anyhow::Error::new(e).context(format!("cannot move {} aside", stage.dest.display()));
                return Err(rollback(&[], &aside, err));
            }
            aside.push((stage.dest.as_path(), old));
        }
    }

    let mut placed: Vec<&Staged> = Vec::new();
    for stage in stages {
        if let Err(e) = fs::rename(stage.path(), &stage.dest) {
            let err = anyhow::Error::new(e).context(format!("cannot move new output to {}", stage.dest.display()));
            return Err(rollback(&placed, &aside, err));
        }
        placed.push(stage);
    }

    for (_, old) in &aside {
        fs::remove_dir_all(old)
            .with_context(|| format!("new output is in place but {} could not be removed", old.display()))?;
    }
    Ok(())
}

/// Moves placed trees back into their staging dirs and previous outputs
/// back to their destinations. Restore failures are logged and added to
/// `err`.
fn rollback(placed: &[&Staged], aside: &[(&Path, PathBuf)], mut err: anyhow::Error) -> anyhow::Error {
    for stage in placed {
        if let Err(e) = fs::rename(&stage.dest, stage.path()) {
            log::error!("cannot withdraw new output {}: {}", stage.dest.display(), e);
            err = err.context(format!("new output left at {}", stage.dest.display()));
        }
    }
    for (dest, old) in aside {
        if let Err(e) = fs::rename(old, dest) {
            log::error!("cannot restore {} from {}: {}", dest.display(), old.display(), e);
            err = err.context(format!("previous output of {} left at {}", dest.display(), old.display()));
        }
    }
    err
}

/// Runs the generator. Per-bundle and per-group problems are logged and
/// reported in the summary; anything returned as an error aborted the run
/// before the outputs were replaced.
pub fn run(cfg: &Config) -> Result<RunSummary> {
    let collector = GroupCollector::new(&cfg.input);
    if !cfg.force && !collector.needs_update() {
        log::info!("no update needed for {}", cfg.input.display());
        return Ok(RunSummary { up_to_date: true, ..RunSummary::default() });
    }

    let paths = collector.collect_image_paths()?;
    log::debug!("found {} 2x and {} 3x images", paths.two_x.len(), paths.three_x.len());

    let atlas_root = Staged::new(&cfg.atlas_out)?;
    let data_root = if same_location(&cfg.atlas_out, &cfg.data_out) {
        log::debug!("atlas and data bundles share {}", cfg.atlas_out.display());
        None
    } else {
        Some(Staged::new(&cfg.data_out)?)
    };
    let data_stage = data_root.as_ref().unwrap_or(&atlas_root);
    for root in std::iter::once(&atlas_root).chain(data_root.as_ref()) {
        export::copy_root_contents(&cfg.input, root.path())
            .context("cannot copy the catalog root descriptor")?;
    }

    let packer = AtlasPacker::new(cfg.max_edge);
    let mut summary = RunSummary::default();
    for scale in Scale::PACKED {
        let groups = collector.group_by_folder(paths.for_scale(scale));
        for (group, group_paths) in groups.iter() {
            let result = match packer.pack_paths(group_paths) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("skipping {}@{}: {}", group, scale, e);
                    summary.skipped.push(SkippedAtlas { group: group.to_string(), scale, reason: e.to_string() });
                    continue;
                }
            };
            let png = export::write_atlas_bundle(atlas_root.path(), group, scale, &result.image)?;
            export::write_frame_bundle(data_stage.path(), group, scale, &result.frames)?;
            log::info!(
                "{}@{}: {} images, {}px atlas -> {}",
                group,
                scale,
                result.frames.len(),
                result.grid.edge(),
                cfg.atlas_out.join(png.strip_prefix(atlas_root.path()).unwrap_or(&png)).display()
            );
            summary.packed.push(PackedAtlas {
                group: group.to_string(),
                scale,
                images: group_paths.len(),
                edge: result.image.width(),
            });
        }
    }

    let stages: Vec<Staged> = std::iter::once(atlas_root).chain(data_root).collect();
    commit_all(&stages)?;
    Ok(summary)
}
