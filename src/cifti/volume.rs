//! Sub-cortical voxel extraction from a label atlas.

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use super::model::{ExtractedModel, ModelIndices};
use super::registry::StructureSpec;
use crate::nifti::{LabelVolume, SeriesVolume};
use crate::util::{Error, Result};

/// Voxels carrying `code`, in row-major order (i slowest, k fastest).
pub fn find_voxels(labels: &LabelVolume, code: i32) -> Vec<[usize; 3]> {
    let [nx, ny, nz] = labels.shape();
    let mut voxels = Vec::new();
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                if labels.label(i, j, k) == code {
                    voxels.push([i, j, k]);
                }
            }
        }
    }
    voxels
}

/// Extract one structure. Each code is searched separately and the voxel
/// lists are concatenated in code order.
pub fn extract_volume(
    structure: &str,
    labels: &LabelVolume,
    series: &SeriesVolume,
    codes: &[i32],
) -> Result<ExtractedModel> {
    if labels.shape() != series.spatial_shape() {
        return Err(Error::ShapeMismatch { label: labels.shape(), series: series.spatial_shape() });
    }

    let voxels: Vec<[usize; 3]> = codes.iter().flat_map(|&code| find_voxels(labels, code)).collect();
    let block = Array2::from_shape_fn((series.frames(), voxels.len()), |(t, c)| {
        let [i, j, k] = voxels[c];
        series.value(i, j, k, t)
    });

    debug!(structure, ?codes, voxels = voxels.len(), "extracted volume");
    Ok(ExtractedModel {
        structure: structure.to_string(),
        indices: ModelIndices::Volume { voxels },
        series: block,
    })
}

/// Extract every volume structure in parallel; results keep input order.
pub fn extract_volumes(
    specs: &[&StructureSpec],
    labels: &LabelVolume,
    series: &SeriesVolume,
) -> Result<Vec<ExtractedModel>> {
    if labels.shape() != series.spatial_shape() {
        return Err(Error::ShapeMismatch { label: labels.shape(), series: series.spatial_shape() });
    }
    specs
        .par_iter()
        .map(|spec| extract_volume(spec.name, labels, series, spec.label_codes()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cifti::registry;
    use glam::DMat4;

    fn bold(shape: [usize; 3], frames: usize) -> SeriesVolume {
        let n = shape.iter().product::<usize>() * frames;
        let data = (0..n).map(|v| v as f32).collect();
        SeriesVolume::new([shape[0], shape[1], shape[2], frames], DMat4::IDENTITY, data).unwrap()
    }

    #[test]
    fn test_row_major_discovery_order() {
        // (0,0,1) and (1,0,0) both labelled; i varies slowest.
        let mut labels = vec![0; 8];
        labels[1] = 5; // (1,0,0)
        labels[4] = 5; // (0,0,1)
        let labels = LabelVolume::new([2, 2, 2], labels).unwrap();
        assert_eq!(find_voxels(&labels, 5), vec![[0, 0, 1], [1, 0, 0]]);
    }

    #[test]
    fn test_twelve_voxels_and_empty_code() {
        let mut values = vec![0; 4 * 4 * 4];
        for v in values.iter_mut().take(12) {
            *v = 17;
        }
        let labels = LabelVolume::new([4, 4, 4], values).unwrap();
        let series = bold([4, 4, 4], 3);

        let model = extract_volume("CIFTI_STRUCTURE_HIPPOCAMPUS_LEFT", &labels, &series, &[17]).unwrap();
        assert_eq!(model.count(), 12);
        assert_eq!(model.series.shape(), &[3, 12]);

        let empty = extract_volume("CIFTI_STRUCTURE_AMYGDALA_LEFT", &labels, &series, &[18]).unwrap();
        assert_eq!(empty.count(), 0);
        assert_eq!(empty.series.shape(), &[3, 0]);
    }

    #[test]
    fn test_codes_are_concatenated() {
        let labels = LabelVolume::new([2, 1, 1], vec![7, 3]).unwrap();
        let series = bold([2, 1, 1], 2);
        let model = extract_volume("X", &labels, &series, &[3, 7]).unwrap();
        let ModelIndices::Volume { voxels } = &model.indices else {
            panic!("expected voxels");
        };
        assert_eq!(voxels, &[[1, 0, 0], [0, 0, 0]]);
        // frame 1 of voxel (1,0,0) is data[1 + 2]
        assert_eq!(model.series[[1, 0]], 3.0);
        assert_eq!(model.series[[0, 1]], 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let labels = LabelVolume::new([2, 2, 2], vec![0; 8]).unwrap();
        let series = bold([2, 2, 3], 1);
        let err = extract_volume("X", &labels, &series, &[1]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_parallel_extraction_keeps_order_and_is_disjoint() {
        let specs: Vec<_> = registry::volumes().collect();
        let codes: Vec<i32> = specs.iter().map(|s| s.label_codes()[0]).collect();
        let values: Vec<i32> = (0..5 * 5 * 5).map(|i| codes[i % codes.len()]).collect();
        let labels = LabelVolume::new([5, 5, 5], values).unwrap();
        let series = bold([5, 5, 5], 2);

        let models = extract_volumes(&specs, &labels, &series).unwrap();
        let names: Vec<_> = models.iter().map(|m| m.structure.as_str()).collect();
        let expected: Vec<_> = specs.iter().map(|s| s.name).collect();
        assert_eq!(names, expected);

        let mut seen = std::collections::HashSet::new();
        for model in &models {
            let ModelIndices::Volume { voxels } = &model.indices else {
                panic!("expected voxels");
            };
            for v in voxels {
                assert!(seen.insert(*v), "voxel {:?} claimed twice", v);
            }
        }
        assert_eq!(seen.len(), 125);
    }
}
