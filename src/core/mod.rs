//! Core layer - fundamental header types shared by the codecs.
//!
//! This module provides:
//! - [`SeriesMap`] - Temporal map of a dense time series
//! - [`MetaData`] - Ordered key-value metadata storage
//! - gzip / zlib helpers
//! - [`xml`] - quick-xml writer and attribute helpers

mod series;
mod metadata;
mod compression;
pub mod xml;

pub use series::{SeriesMap, SeriesUnit};
pub use metadata::MetaData;
pub use compression::{gunzip, gzip, is_gzip, is_zlib, zlib_compress, zlib_decompress, GZIP_MAGIC};
