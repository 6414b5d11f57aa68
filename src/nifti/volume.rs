//! Decoded volumes used by the extractors.
//!
//! Data is kept in NIfTI order: the first axis varies fastest, so voxel
//! (i, j, k) of frame t lives at `i + nx * (j + ny * (k + nz * t))`.

use std::path::Path;

use glam::DMat4;

use super::reader::NiftiImage;
use crate::util::{Error, Result};

/// 3D integer label volume (atlas).
#[derive(Clone, Debug, PartialEq)]
pub struct LabelVolume {
    shape: [usize; 3],
    labels: Vec<i32>,
}

impl LabelVolume {
    /// Create a label volume, checking the element count.
    pub fn new(shape: [usize; 3], labels: Vec<i32>) -> Result<Self> {
        let expected = shape.iter().product::<usize>();
        if labels.len() != expected {
            return Err(Error::invalid(format!(
                "label volume {:?} needs {} values, got {}",
                shape,
                expected,
                labels.len()
            )));
        }
        Ok(Self { shape, labels })
    }

    /// Load an atlas from disk. Trailing singleton dimensions are allowed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_image(&NiftiImage::open(path)?)
    }

    pub fn from_image(image: &NiftiImage) -> Result<Self> {
        let shape = image.shape();
        if shape.len() < 3 || shape[3..].iter().any(|&d| d != 1) {
            return Err(Error::invalid(format!("label volume must be 3D, got {:?}", shape)));
        }
        Self::new([shape[0], shape[1], shape[2]], image.read_labels()?)
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[inline]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Label at voxel (i, j, k).
    #[inline]
    pub fn label(&self, i: usize, j: usize, k: usize) -> i32 {
        let [nx, ny, _] = self.shape;
        self.labels[i + nx * (j + ny * k)]
    }
}

/// 4D time-series volume with its voxel-to-world affine.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesVolume {
    shape: [usize; 4],
    affine: DMat4,
    data: Vec<f32>,
}

impl SeriesVolume {
    /// Create a series volume, checking the element count.
    pub fn new(shape: [usize; 4], affine: DMat4, data: Vec<f32>) -> Result<Self> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(Error::invalid(format!(
                "series volume {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, affine, data })
    }

    /// Load a 4D series from disk. A 3D file is one frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_image(&NiftiImage::open(path)?)
    }

    pub fn from_image(image: &NiftiImage) -> Result<Self> {
        let shape = image.shape();
        if shape.len() < 3 || shape.len() > 4 {
            return Err(Error::invalid(format!("series volume must be 3D or 4D, got {:?}", shape)));
        }
        let frames = shape.get(3).copied().unwrap_or(1);
        Self::new([shape[0], shape[1], shape[2], frames], image.affine(), image.read_f32()?)
    }

    #[inline]
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// First three dimensions.
    #[inline]
    pub fn spatial_shape(&self) -> [usize; 3] {
        [self.shape[0], self.shape[1], self.shape[2]]
    }

    /// Number of frames (fourth dimension).
    #[inline]
    pub fn frames(&self) -> usize {
        self.shape[3]
    }

    #[inline]
    pub fn affine(&self) -> &DMat4 {
        &self.affine
    }

    /// Value at voxel (i, j, k) in frame t.
    #[inline]
    pub fn value(&self, i: usize, j: usize, k: usize, t: usize) -> f32 {
        let [nx, ny, nz, _] = self.shape;
        self.data[i + nx * (j + ny * (k + nz * t))]
    }
}
