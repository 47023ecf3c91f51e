//! Bundle discovery and grouping by enclosing folder.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use walkdir::WalkDir;

use super::{is_bundle_segment, Descriptor, Scale, BUNDLE_SUFFIX, DEFAULT_GROUP};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cannot walk asset tree {}: {}", .path.display(), .source)]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Image paths found in the tree, split by scale, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalePaths {
    pub two_x: Vec<PathBuf>,
    pub three_x: Vec<PathBuf>,
}

impl ScalePaths {
    pub fn for_scale(&self, scale: Scale) -> &[PathBuf] {
        match scale {
            Scale::Two => &self.two_x,
            Scale::Three => &self.three_x,
            Scale::One => &[],
        }
    }
}

/// Group name to ordered image paths. Groups iterate in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups {
    groups: IndexMap<String, Vec<PathBuf>>,
}

impl Groups {
    /// Appends `path` to `group`, creating the group on first use.
    pub fn push(&mut self, group: impl Into<String>, path: PathBuf) {
        self.groups.entry(group.into()).or_default().push(path);
    }

    pub fn paths_for_group(&self, group: &str) -> Option<&[PathBuf]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Walks one asset catalog rooted at `root`.
#[derive(Debug, Clone)]
pub struct GroupCollector {
    root: PathBuf,
}

impl GroupCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// False once the root descriptor carries `info.customVersion`.
    /// A missing or unreadable descriptor means a rebuild is needed.
    pub fn needs_update(&self) -> bool {
        match Descriptor::load_dir(&self.root) {
            Descriptor::Parsed(v) => v.pointer("/info/customVersion").is_none(),
            Descriptor::Absent => {
                log::debug!("no root descriptor in {}", self.root.display());
                true
            }
            Descriptor::Malformed(reason) => {
                log::warn!("root descriptor in {} is malformed: {}", self.root.display(), reason);
                true
            }
        }
    }

    /// Finds every `.imageset` bundle below the root and resolves its 2x and
    /// 3x image files. Bundle-level problems are logged and skipped; only a
    /// failure to walk the tree itself is an error.
    pub fn collect_image_paths(&self) -> Result<ScalePaths, CollectError> {
        let mut out = ScalePaths::default();
        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|source| CollectError::Walk { path: self.root.clone(), source })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let is_bundle = entry.file_name().to_str().map(is_bundle_segment).unwrap_or(false);
            if !is_bundle {
                continue;
            }
            walker.skip_current_dir();
            self.collect_bundle(entry.path(), &mut out);
        }
        Ok(out)
    }

    fn collect_bundle(&self, bundle: &Path, out: &mut ScalePaths) {
        let contents = match Descriptor::load_dir(bundle).bundle() {
            Ok(c) => c,
            Err(reason) => {
                log::warn!("skipping bundle {}: {}", bundle.display(), reason);
                return;
            }
        };

        for entry in &contents.images {
            let scale = entry.scale();
            let Some(filename) = entry.filename() else {
                if scale != Some(Scale::One) {
                    log::warn!(
                        "{} has no file for {}",
                        bundle.display(),
                        entry.scale.as_deref().unwrap_or("unknown scale")
                    );
                }
                continue;
            };
            let path = bundle.join(filename);
            match scale {
                Some(Scale::One) => {}
                Some(Scale::Two) => out.two_x.push(path),
                Some(Scale::Three) => out.three_x.push(path),
                None => log::warn!(
                    "{}: ignoring {} with unknown scale {:?}",
                    bundle.display(),
                    filename,
                    entry.scale
                ),
            }
        }
    }

    /// Partitions `paths` by the folder enclosing their bundle. Top-level
    /// bundles land in the default group.
    pub fn group_by_folder(&self, paths: &[PathBuf]) -> Groups {
        let mut groups = Groups::default();
        for path in paths {
            groups.push(self.group_name(path), path.clone());
        }
        groups
    }

    /// The component right before the bundle segment, relative to the root;
    /// the default group when the bundle sits directly under the root or no
    /// bundle segment is present.
    pub fn group_name(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<&str> = rel.components().filter_map(|c| c.as_os_str().to_str()).collect();
        match parts.iter().rposition(|c| is_bundle_segment(c)) {
            Some(i) if i > 0 => parts[i - 1].to_string(),
            _ => DEFAULT_GROUP.to_string(),
        }
    }
}

/// `<name>.imageset` directory name for a group.
pub fn bundle_dir_name(group: &str) -> String {
    format!("{}{}", group, BUNDLE_SUFFIX)
}
