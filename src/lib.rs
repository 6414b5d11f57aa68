//! # cifti
//!
//! Assembles cortical-surface and sub-cortical volumetric time series into a
//! single CIFTI-2 dense time series (`.dtseries.nii`).
//!
//! ## Modules
//!
//! - [`util`] - Errors and affine helpers
//! - [`core`] - Series map, metadata, compression, XML helpers
//! - [`nifti`] - NIfTI-1 / NIfTI-2 volume codec
//! - [`surface`] - FreeSurfer annotations and GIFTI surface series
//! - [`cifti`] - Structure registry, extraction, assembly, dtseries codec
//! - [`pipeline`] - Configured end-to-end generation
//!
//! ## Example
//!
//! ```ignore
//! use cifti::pipeline::{GenerateCifti, GenerateConfig};
//!
//! let config = GenerateConfig::load("run.json")?;
//! let output = GenerateCifti::new(config).run()?;
//! println!("wrote {}", output.path.display());
//! ```

pub mod util;
pub mod core;
pub mod nifti;
pub mod surface;
pub mod cifti;
pub mod pipeline;

// Re-export commonly used types
pub use util::{Error, Result};
pub use cifti::{read_dense_series, CiftiHeader, DenseSeries};
pub use pipeline::{GenerateCifti, GenerateConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::core::{MetaData, SeriesMap, SeriesUnit};
    pub use crate::nifti::{LabelVolume, NiftiImage, SeriesVolume};
    pub use crate::surface::{Annotation, Hemisphere, SurfaceSeries};
    pub use crate::cifti::{
        assemble, extract_surface, extract_volume, read_dense_series, write_dense_series, BrainModelEntry,
        CiftiHeader, DenseSeries, ModelIndices, StructureSpec, VolumeGeometry,
    };
    pub use crate::pipeline::{GenerateCifti, GenerateConfig, GenerateOutput};
}
