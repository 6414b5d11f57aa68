//! End-to-end generation of a dense series from files on disk.

mod config;
mod generate;
mod resources;

pub use config::GenerateConfig;
pub use generate::{build_dense_series, GenerateCifti, GenerateOutput};
pub use resources::{
    discover_annotations, resolve_atlas, validate_targets, AnnotationFiles, ATLAS_DATASET, ATLAS_FILE,
    SURFACE_TARGETS, VOLUME_TARGETS,
};
