//! Target validation and resource lookup.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::surface::Hemisphere;
use crate::util::{Error, Result};

/// Volume spaces with a label atlas.
pub const VOLUME_TARGETS: &[&str] = &["MNI152NLin2009cAsym"];

/// Surface spaces with FreeSurfer annotations.
pub const SURFACE_TARGETS: &[&str] = &["fsaverage5", "fsaverage6", "fsaverage"];

/// Dataset directory of the label atlas inside the templates directory.
pub const ATLAS_DATASET: &str = "oasis_dkt31_mni152";

/// Label atlas file inside [`ATLAS_DATASET`].
pub const ATLAS_FILE: &str = "OASIS-TRT-20_jointfusion_DKT31_CMA_labels_in_MNI152NLin2009cAsym_2mm_v2.nii.gz";

const ANNOT_SUFFIX: &str = "h.aparc.annot";

/// Reject any target pair other than the supported ones.
pub fn validate_targets(volume_target: &str, surface_target: &str) -> Result<()> {
    if VOLUME_TARGETS.contains(&volume_target) && SURFACE_TARGETS.contains(&surface_target) {
        Ok(())
    } else {
        Err(Error::UnsupportedSpace {
            volume: volume_target.to_string(),
            surface: surface_target.to_string(),
        })
    }
}

/// Per-hemisphere `aparc` annotation files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationFiles {
    pub left: PathBuf,
    pub right: PathBuf,
}

impl AnnotationFiles {
    pub fn get(&self, hemisphere: Hemisphere) -> &Path {
        match hemisphere {
            Hemisphere::Left => &self.left,
            Hemisphere::Right => &self.right,
        }
    }
}

/// Find `?h.aparc.annot` in `<subjects_dir>/<surface_target>/label`.
pub fn discover_annotations(subjects_dir: &Path, surface_target: &str) -> Result<AnnotationFiles> {
    let dir = subjects_dir.join(surface_target).join("label");
    let missing = || Error::MissingAnnotation {
        target: surface_target.to_string(),
        dir: subjects_dir.to_path_buf(),
    };

    let mut found: Vec<PathBuf> = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(ANNOT_SUFFIX))
            })
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing()),
        Err(e) => return Err(Error::Io(e)),
    };
    found.sort();
    debug!(dir = %dir.display(), files = found.len(), "annotation files");

    let pick = |hemisphere: Hemisphere| {
        let name = format!("{}.aparc.annot", hemisphere.prefix());
        found
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == name.as_str()))
            .cloned()
            .ok_or_else(missing)
    };
    Ok(AnnotationFiles { left: pick(Hemisphere::Left)?, right: pick(Hemisphere::Right)? })
}

/// Atlas path: `label_file` when given, else the dataset file under
/// `templates_dir`. The file must exist.
pub fn resolve_atlas(templates_dir: &Path, label_file: Option<&Path>) -> Result<PathBuf> {
    let path = match label_file {
        Some(path) => path.to_path_buf(),
        None => templates_dir.join(ATLAS_DATASET).join(ATLAS_FILE),
    };
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::MissingAtlas(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_targets() {
        assert!(validate_targets("MNI152NLin2009cAsym", "fsaverage5").is_ok());
        assert!(validate_targets("MNI152NLin2009cAsym", "fsaverage").is_ok());
        assert!(matches!(
            validate_targets("MNI152NLin2009cAsym", "fsnative"),
            Err(Error::UnsupportedSpace { .. })
        ));
        assert!(matches!(validate_targets("T1w", "fsaverage5"), Err(Error::UnsupportedSpace { .. })));
    }

    #[test]
    fn test_discover_annotations() {
        let subjects = tempfile::tempdir().unwrap();
        let label = subjects.path().join("fsaverage5").join("label");
        fs::create_dir_all(&label).unwrap();
        for name in ["rh.aparc.annot", "lh.aparc.annot", "lh.aparc.a2009s.annot", "lh.cortex.label"] {
            fs::write(label.join(name), b"").unwrap();
        }

        let files = discover_annotations(subjects.path(), "fsaverage5").unwrap();
        assert_eq!(files.left, label.join("lh.aparc.annot"));
        assert_eq!(files.get(Hemisphere::Right), label.join("rh.aparc.annot"));
    }

    #[test]
    fn test_missing_annotations() {
        let subjects = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_annotations(subjects.path(), "fsaverage6"),
            Err(Error::MissingAnnotation { .. })
        ));

        let label = subjects.path().join("fsaverage6").join("label");
        fs::create_dir_all(&label).unwrap();
        fs::write(label.join("lh.aparc.annot"), b"").unwrap();
        assert!(matches!(
            discover_annotations(subjects.path(), "fsaverage6"),
            Err(Error::MissingAnnotation { .. })
        ));
    }

    #[test]
    fn test_resolve_atlas() {
        let templates = tempfile::tempdir().unwrap();
        assert!(matches!(resolve_atlas(templates.path(), None), Err(Error::MissingAtlas(_))));

        let dataset = templates.path().join(ATLAS_DATASET);
        fs::create_dir_all(&dataset).unwrap();
        fs::write(dataset.join(ATLAS_FILE), b"").unwrap();
        assert_eq!(resolve_atlas(templates.path(), None).unwrap(), dataset.join(ATLAS_FILE));

        let custom = templates.path().join("custom.nii.gz");
        assert!(resolve_atlas(templates.path(), Some(&custom)).is_err());
        fs::write(&custom, b"").unwrap();
        assert_eq!(resolve_atlas(templates.path(), Some(&custom)).unwrap(), custom);
    }
}
