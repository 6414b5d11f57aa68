//! The `GenerateCifti` run: resolve resources, load inputs, assemble, write.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use super::config::GenerateConfig;
use super::resources::{discover_annotations, resolve_atlas, validate_targets};
use crate::cifti::registry::{self, StructureSpec};
use crate::cifti::{
    assemble, extract_surface, extract_volumes, output_path, save_dense_series, series_metadata, DenseSeries,
    VolumeGeometry,
};
use crate::core::MetaData;
use crate::nifti::{LabelVolume, NiftiImage, SeriesVolume};
use crate::surface::{Annotation, Hemisphere, SurfaceSeries};
use crate::util::{Error, Result};

/// Result of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateOutput {
    /// Input file name without its NIfTI extension.
    pub base_name: String,
    pub path: PathBuf,
    pub frames: usize,
    pub columns: usize,
}

/// Builds a `.dtseries.nii` from a volumetric BOLD series and two surface
/// series.
#[derive(Clone, Debug)]
pub struct GenerateCifti {
    config: GenerateConfig,
}

impl GenerateCifti {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    /// Run end to end. Targets are checked before any file is touched.
    pub fn run(&self) -> Result<GenerateOutput> {
        let cfg = &self.config;
        let started = Instant::now();

        validate_targets(&cfg.volume_target, &cfg.surface_target)?;
        cfg.validate()?;

        let annotations = discover_annotations(&cfg.subjects_dir, &cfg.surface_target)?;
        let atlas = resolve_atlas(&cfg.templates_dir, cfg.label_file.as_deref())?;
        info!(
            surface_target = %cfg.surface_target,
            volume_target = %cfg.volume_target,
            atlas = %atlas.display(),
            "resolved resources"
        );

        let bold = SeriesVolume::from_image(&NiftiImage::open_opts(&cfg.bold_file, cfg.use_mmap)?)?;
        let labels = LabelVolume::from_image(&NiftiImage::open_opts(&atlas, cfg.use_mmap)?)?;
        info!(
            bold = %cfg.bold_file.display(),
            shape = ?bold.shape(),
            "loaded volumes"
        );

        let mut annots = Vec::with_capacity(2);
        let mut surfaces = Vec::with_capacity(2);
        for (hemisphere, gifti) in Hemisphere::ALL.into_iter().zip(&cfg.gifti_files) {
            surfaces.push(load_surface(gifti, hemisphere)?);
            annots.push(Annotation::open(annotations.get(hemisphere))?);
        }

        let metadata = series_metadata(&cfg.surface_target, &cfg.volume_target, cfg.atlas_url.as_deref());
        let dense = build_dense_series(
            &bold,
            &labels,
            [&annots[0], &annots[1]],
            [&surfaces[0], &surfaces[1]],
            cfg.repetition_time,
            metadata,
        )?;

        std::fs::create_dir_all(&cfg.out_dir).map_err(|e| Error::write(&cfg.out_dir, e))?;
        let base_name = save_dense_series(&dense, &cfg.out_dir, &cfg.bold_file)?;
        let path = output_path(&cfg.out_dir, &base_name);

        info!(
            path = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dense series generated"
        );
        Ok(GenerateOutput {
            base_name,
            path,
            frames: dense.header.num_frames(),
            columns: dense.header.num_columns(),
        })
    }
}

/// Read a GIFTI series and check any hemisphere it declares.
fn load_surface(path: &Path, expected: Hemisphere) -> Result<SurfaceSeries> {
    let series = SurfaceSeries::open(path)?;
    match series.hemisphere() {
        Some(declared) if declared != expected => Err(Error::HemisphereMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            declared: declared.to_string(),
        }),
        _ => Ok(series),
    }
}

/// Assemble loaded inputs. `annotations` and `surfaces` are `[left, right]`.
pub fn build_dense_series(
    bold: &SeriesVolume,
    labels: &LabelVolume,
    annotations: [&Annotation; 2],
    surfaces: [&SurfaceSeries; 2],
    repetition_time: f64,
    metadata: MetaData,
) -> Result<DenseSeries> {
    let mut models = Vec::with_capacity(registry::structures().len());
    for spec in registry::surfaces() {
        let idx = match spec.hemisphere() {
            Some(Hemisphere::Left) => 0,
            _ => 1,
        };
        models.push(extract_surface(spec.name, annotations[idx], surfaces[idx])?);
    }

    let volume_specs: Vec<&StructureSpec> = registry::volumes().collect();
    models.extend(extract_volumes(&volume_specs, labels, bold)?);
    debug!(structures = models.len(), "extraction finished");

    let geometry = VolumeGeometry::new(bold.spatial_shape(), *bold.affine());
    assemble(models, bold.frames(), repetition_time, geometry, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_space_before_io() {
        let config = GenerateConfig {
            surface_target: "fsnative".into(),
            bold_file: "/does/not/exist.nii.gz".into(),
            ..Default::default()
        };
        let err = GenerateCifti::new(config).run().unwrap_err();
        assert!(matches!(err, Error::UnsupportedSpace { .. }));
    }

    #[test]
    fn test_hemisphere_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rh.func.gii");
        SurfaceSeries::new(vec![vec![0.0; 3]])
            .unwrap()
            .with_hemisphere(Hemisphere::Right)
            .write(&path)
            .unwrap();

        assert!(load_surface(&path, Hemisphere::Right).is_ok());
        assert!(matches!(load_surface(&path, Hemisphere::Left), Err(Error::HemisphereMismatch { .. })));
    }
}
