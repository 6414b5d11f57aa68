//! Dense time-series assembly and the CIFTI-2 `.dtseries.nii` format.
//!
//! Columns of the matrix form one composite spatial index: each registry
//! structure owns a contiguous range, surfaces first, and the ranges tile
//! `0..columns` without gaps.
//!
//! ```text
//! annotation + GIFTI  --extract_surface-->  ExtractedModel ─┐
//! atlas + bold volume --extract_volumes-->  ExtractedModel ─┼─ assemble ─> DenseSeries ─> .dtseries.nii
//!                                                           ┘
//! ```

pub mod registry;
mod model;
mod surface;
mod volume;
mod offsets;
mod assemble;
pub mod xml;
mod writer;
mod reader;

pub use assemble::{assemble, series_metadata};
pub use model::{
    BrainModelEntry, CiftiHeader, DenseSeries, ExtractedModel, ModelIndices, ModelType, VolumeGeometry,
};
pub use offsets::allocate_offsets;
pub use reader::{decode_dense_series, read_dense_series};
pub use registry::{StructureKind, StructureSpec, REGISTRY};
pub use surface::extract_surface;
pub use volume::{extract_volume, extract_volumes, find_voxels};
pub use writer::{
    encode_dense_series, output_base_name, output_path, save_dense_series, write_dense_series, DTSERIES_SUFFIX,
};
