//! In-memory form of a dense time series: matrix plus CIFTI header.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use glam::DMat4;
use ndarray::Array2;

use crate::core::{MetaData, SeriesMap};
use crate::util::{Error, Result};

/// CIFTI-2 `ModelType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelType {
    Surface,
    Voxels,
}

impl ModelType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Surface => "CIFTI_MODEL_TYPE_SURFACE",
            Self::Voxels => "CIFTI_MODEL_TYPE_VOXELS",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CIFTI_MODEL_TYPE_SURFACE" => Ok(Self::Surface),
            "CIFTI_MODEL_TYPE_VOXELS" => Ok(Self::Voxels),
            other => Err(Error::invalid(format!("unknown ModelType '{}'", other))),
        }
    }
}

/// Anatomical addresses of a brain model's columns, in column order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelIndices {
    /// Retained vertices, strictly increasing.
    Surface { vertex_indices: Vec<usize>, total_vertices: usize },
    /// Voxel (i, j, k) triples in discovery order.
    Volume { voxels: Vec<[usize; 3]> },
}

impl ModelIndices {
    /// Number of columns.
    pub fn len(&self) -> usize {
        match self {
            Self::Surface { vertex_indices, .. } => vertex_indices.len(),
            Self::Volume { voxels } => voxels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            Self::Surface { .. } => ModelType::Surface,
            Self::Volume { .. } => ModelType::Voxels,
        }
    }
}

/// One structure's slice of the spatial index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrainModelEntry {
    pub structure: String,
    pub index_offset: usize,
    pub index_count: usize,
    pub indices: ModelIndices,
}

impl BrainModelEntry {
    #[inline]
    pub fn model_type(&self) -> ModelType {
        self.indices.model_type()
    }

    /// Columns covered by this entry.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.index_offset..self.index_offset + self.index_count
    }
}

/// One structure as produced by an extractor, before offsets are known.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedModel {
    pub structure: String,
    pub indices: ModelIndices,
    /// `(frames, count)` block.
    pub series: Array2<f32>,
}

impl ExtractedModel {
    #[inline]
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.series.nrows()
    }
}

/// Voxel grid shared by all volume entries.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeGeometry {
    pub dims: [usize; 3],
    /// Voxel (i, j, k) to world; units are `10^meter_exponent` metres.
    pub affine: DMat4,
    pub meter_exponent: i32,
}

impl VolumeGeometry {
    /// Millimetre exponent used for every written file.
    pub const MILLIMETERS: i32 = -3;

    pub fn new(dims: [usize; 3], affine: DMat4) -> Self {
        Self { dims, affine, meter_exponent: Self::MILLIMETERS }
    }
}

/// Header of a dense time series: temporal map, spatial map, metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct CiftiHeader {
    pub series: SeriesMap,
    pub brain_models: Vec<BrainModelEntry>,
    pub volume: Option<VolumeGeometry>,
    pub metadata: MetaData,
}

impl CiftiHeader {
    /// Rows of the matrix.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.series.num_points
    }

    /// Columns of the matrix.
    pub fn num_columns(&self) -> usize {
        self.brain_models.iter().map(|m| m.index_count).sum()
    }

    pub fn model(&self, structure: &str) -> Option<&BrainModelEntry> {
        self.brain_models.iter().find(|m| m.structure == structure)
    }

    /// Entry owning column `c`.
    pub fn model_of_column(&self, column: usize) -> Option<&BrainModelEntry> {
        self.brain_models.iter().find(|m| m.range().contains(&column))
    }

    /// Check counts against payloads and that the entries tile the index.
    pub fn validate(&self) -> Result<()> {
        let mut next = 0;
        for model in &self.brain_models {
            if model.index_count != model.indices.len() {
                return Err(Error::invalid(format!(
                    "{} declares IndexCount {} but lists {} indices",
                    model.structure,
                    model.index_count,
                    model.indices.len()
                )));
            }
            if model.index_offset != next {
                return Err(Error::invalid(format!(
                    "{} starts at {}, expected {}",
                    model.structure, model.index_offset, next
                )));
            }
            if let ModelIndices::Surface { vertex_indices, total_vertices } = &model.indices {
                let increasing = vertex_indices.windows(2).all(|w| w[0] < w[1]);
                let in_range = vertex_indices.last().map_or(true, |&v| v < *total_vertices);
                if !increasing || !in_range {
                    return Err(Error::invalid(format!(
                        "{} vertex indices must increase within {} vertices",
                        model.structure, total_vertices
                    )));
                }
            }
            next += model.index_count;
        }
        let has_voxels = self.brain_models.iter().any(|m| m.model_type() == ModelType::Voxels);
        if has_voxels && self.volume.is_none() {
            return Err(Error::invalid("voxel brain models need a Volume element"));
        }
        Ok(())
    }
}

/// Dense time series: `(frames, columns)` matrix and its header.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseSeries {
    pub header: CiftiHeader,
    pub matrix: Array2<f32>,
}

impl DenseSeries {
    /// Series of the given column.
    pub fn column(&self, c: usize) -> ndarray::ArrayView1<'_, f32> {
        self.matrix.column(c)
    }

    /// Columns belonging to `structure`.
    pub fn structure_block(&self, structure: &str) -> Option<ndarray::ArrayView2<'_, f32>> {
        let range = self.header.model(structure)?.range();
        Some(self.matrix.slice(ndarray::s![.., range]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> CiftiHeader {
        CiftiHeader {
            series: SeriesMap::seconds(3, 2.0),
            brain_models: vec![
                BrainModelEntry {
                    structure: "CIFTI_STRUCTURE_CORTEX_LEFT".into(),
                    index_offset: 0,
                    index_count: 2,
                    indices: ModelIndices::Surface { vertex_indices: vec![1, 3], total_vertices: 4 },
                },
                BrainModelEntry {
                    structure: "CIFTI_STRUCTURE_BRAIN_STEM".into(),
                    index_offset: 2,
                    index_count: 1,
                    indices: ModelIndices::Volume { voxels: vec![[1, 2, 3]] },
                },
            ],
            volume: Some(VolumeGeometry::new([4, 4, 4], DMat4::IDENTITY)),
            metadata: MetaData::new(),
        }
    }

    #[test]
    fn test_model_lookup() {
        let h = header();
        assert_eq!(h.num_columns(), 3);
        assert_eq!(h.model_of_column(2).unwrap().structure, "CIFTI_STRUCTURE_BRAIN_STEM");
        assert!(h.model_of_column(3).is_none());
        assert_eq!(h.model("CIFTI_STRUCTURE_CORTEX_LEFT").unwrap().model_type(), ModelType::Surface);
        assert!(h.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_gaps_and_bad_vertices() {
        let mut h = header();
        h.brain_models[1].index_offset = 3;
        assert!(h.validate().is_err());

        let mut h = header();
        h.brain_models[0].indices =
            ModelIndices::Surface { vertex_indices: vec![3, 1], total_vertices: 4 };
        assert!(h.validate().is_err());

        let mut h = header();
        h.volume = None;
        assert!(h.validate().is_err());
    }

    #[test]
    fn test_model_type_names() {
        assert_eq!("CIFTI_MODEL_TYPE_VOXELS".parse::<ModelType>().unwrap(), ModelType::Voxels);
        assert_eq!(ModelType::Surface.to_string(), "CIFTI_MODEL_TYPE_SURFACE");
        assert!("CIFTI_MODEL_TYPE_OTHER".parse::<ModelType>().is_err());
    }
}
