//! Configuration of a dense-series generation run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Inputs, targets and resource locations for [`GenerateCifti`](super::GenerateCifti).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    // Inputs
    pub bold_file: PathBuf,
    /// Surface series, `[left, right]`.
    pub gifti_files: Vec<PathBuf>,
    /// Seconds between frames.
    pub repetition_time: f64,

    // Targets
    pub volume_target: String,
    pub surface_target: String,

    // Resources
    /// FreeSurfer `SUBJECTS_DIR` holding the surface target subject.
    pub subjects_dir: PathBuf,
    /// Directory holding the label atlas dataset.
    pub templates_dir: PathBuf,
    /// Explicit atlas path; overrides the templates lookup.
    pub label_file: Option<PathBuf>,
    /// Provenance URL recorded as `download_link`.
    pub atlas_url: Option<String>,

    // Output
    pub out_dir: PathBuf,
    /// Memory-map uncompressed volumes.
    pub use_mmap: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            bold_file: PathBuf::new(),
            gifti_files: Vec::new(),
            repetition_time: 0.0,
            volume_target: "MNI152NLin2009cAsym".to_string(),
            surface_target: "fsaverage5".to_string(),
            subjects_dir: PathBuf::new(),
            templates_dir: PathBuf::new(),
            label_file: None,
            atlas_url: None,
            out_dir: PathBuf::from("."),
            use_mmap: true,
        }
    }
}

impl GenerateConfig {
    /// Load a JSON config and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::write(path, e))
    }

    /// Check required fields. Targets are checked separately when the run
    /// starts.
    pub fn validate(&self) -> Result<()> {
        if self.bold_file.as_os_str().is_empty() {
            return Err(Error::Config("bold_file is required".into()));
        }
        if self.gifti_files.len() != 2 {
            return Err(Error::Config(format!(
                "gifti_files needs [left, right], got {} files",
                self.gifti_files.len()
            )));
        }
        if !(self.repetition_time.is_finite() && self.repetition_time > 0.0) {
            return Err(Error::Config(format!(
                "repetition_time must be positive, got {}",
                self.repetition_time
            )));
        }
        if self.subjects_dir.as_os_str().is_empty() {
            return Err(Error::Config("subjects_dir is required".into()));
        }
        if self.label_file.is_none() && self.templates_dir.as_os_str().is_empty() {
            return Err(Error::Config("either label_file or templates_dir is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GenerateConfig {
        GenerateConfig {
            bold_file: "bold.nii.gz".into(),
            gifti_files: vec!["lh.func.gii".into(), "rh.func.gii".into()],
            repetition_time: 2.0,
            subjects_dir: "/opt/freesurfer/subjects".into(),
            templates_dir: "/opt/templates".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "bold_file": "sub-01_bold.nii.gz",
            "gifti_files": ["lh.gii", "rh.gii"],
            "repetition_time": 0.8,
            "subjects_dir": "/subjects",
            "label_file": "/atlas.nii.gz"
        }"#;
        let config: GenerateConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.surface_target, "fsaverage5");
        assert_eq!(config.volume_target, "MNI152NLin2009cAsym");
        assert_eq!(config.out_dir, PathBuf::from("."));
        assert!(config.atlas_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut c = valid();
        c.gifti_files.pop();
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = valid();
        c.repetition_time = 0.0;
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = valid();
        c.templates_dir = PathBuf::new();
        assert!(c.validate().is_err());
        c.label_file = Some("atlas.nii.gz".into());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generate.json");
        let mut config = valid();
        config.atlas_url = Some("https://example.org/atlas.tar.gz".into());
        config.save(&path).unwrap();
        assert_eq!(GenerateConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(GenerateConfig::load(&path), Err(Error::Json(_))));
        assert!(matches!(
            GenerateConfig::load(dir.path().join("missing.json")),
            Err(Error::FileNotFound(_))
        ));
    }
}
