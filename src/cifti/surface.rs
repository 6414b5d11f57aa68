//! Cortical surface extraction with medial-wall exclusion.

use ndarray::Array2;
use tracing::debug;

use super::model::{ExtractedModel, ModelIndices};
use crate::surface::{Annotation, SurfaceSeries};
use crate::util::{Error, Result};

/// Keep every vertex not classified as medial wall, in vertex order.
pub fn extract_surface(
    structure: &str,
    annotation: &Annotation,
    series: &SurfaceSeries,
) -> Result<ExtractedModel> {
    let total_vertices = annotation.num_vertices();
    let medial_wall = annotation.medial_wall_code()?;

    if series.num_frames() == 0 {
        return Err(Error::lookup(format!("{}: surface series has no frames", structure)));
    }
    if series.num_vertices() != total_vertices {
        return Err(Error::lookup(format!(
            "{}: surface series has {} vertices, annotation has {}",
            structure,
            series.num_vertices(),
            total_vertices
        )));
    }

    let vertex_indices: Vec<usize> = annotation
        .labels()
        .iter()
        .enumerate()
        .filter(|&(_, &code)| code != medial_wall)
        .map(|(v, _)| v)
        .collect();

    let frames = series.frames();
    let block = Array2::from_shape_fn((frames.len(), vertex_indices.len()), |(t, c)| {
        frames[t][vertex_indices[c]]
    });

    debug!(
        structure,
        retained = vertex_indices.len(),
        medial_wall = total_vertices - vertex_indices.len(),
        "extracted surface"
    );
    Ok(ExtractedModel {
        structure: structure.to_string(),
        indices: ModelIndices::Surface { vertex_indices, total_vertices },
        series: block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ColorTableEntry;

    fn annotation(labels: Vec<i32>) -> Annotation {
        let entries = vec![
            ColorTableEntry::new(0, "unknown", [25, 5, 25, 0]),
            ColorTableEntry::new(1, "precentral", [60, 20, 220, 0]),
        ];
        Annotation::new(labels, entries).unwrap()
    }

    #[test]
    fn test_medial_wall_removed() {
        let annot = annotation(vec![1, 0, 1, -1, 0]);
        let series = SurfaceSeries::new(vec![
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![10.0, 11.0, 12.0, 13.0, 14.0],
        ])
        .unwrap();

        let model = extract_surface("CIFTI_STRUCTURE_CORTEX_LEFT", &annot, &series).unwrap();
        let ModelIndices::Surface { vertex_indices, total_vertices } = &model.indices else {
            panic!("expected surface indices");
        };
        assert_eq!(vertex_indices, &[0, 2, 3]);
        assert_eq!(*total_vertices, 5);
        assert_eq!(model.series.shape(), &[2, 3]);
        assert_eq!(model.series[[1, 2]], 13.0);
    }

    #[test]
    fn test_length_mismatch_is_lookup_error() {
        let annot = annotation(vec![1, 1, 1]);
        let series = SurfaceSeries::new(vec![vec![0.0; 4]]).unwrap();
        let err = extract_surface("CIFTI_STRUCTURE_CORTEX_LEFT", &annot, &series).unwrap_err();
        assert!(matches!(err, Error::DataLookup(_)));
    }

    #[test]
    fn test_empty_series_is_lookup_error() {
        let annot = annotation(vec![1, 0, 1]);
        let series = SurfaceSeries::new(Vec::new()).unwrap();
        let err = extract_surface("CIFTI_STRUCTURE_CORTEX_LEFT", &annot, &series).unwrap_err();
        assert!(matches!(err, Error::DataLookup(_)));
    }

    #[test]
    fn test_missing_unknown_is_lookup_error() {
        let entries = vec![ColorTableEntry::new(0, "precentral", [60, 20, 220, 0])];
        let annot = Annotation::new(vec![0, 0], entries).unwrap();
        let series = SurfaceSeries::new(vec![vec![0.0; 2]]).unwrap();
        let err = extract_surface("CIFTI_STRUCTURE_CORTEX_RIGHT", &annot, &series).unwrap_err();
        assert!(matches!(err, Error::DataLookup(_)));
    }
}
