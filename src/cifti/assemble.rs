//! Matrix assembly: offsets, column concatenation, header.

use ndarray::{s, Array2};
use tracing::debug;

use super::model::{BrainModelEntry, CiftiHeader, DenseSeries, ExtractedModel, VolumeGeometry};
use super::offsets::allocate_offsets;
use super::registry;
use crate::core::{MetaData, SeriesMap};
use crate::util::{Error, Result};

/// Metadata attached to every written series. `download_link` is omitted
/// when `None`.
pub fn series_metadata(
    target_surface: &str,
    target_volume: &str,
    download_link: Option<&str>,
) -> MetaData {
    let mut meta = MetaData::new();
    meta.set(MetaData::TARGET_SURFACE_KEY, target_surface);
    meta.set(MetaData::TARGET_VOLUME_KEY, target_volume);
    if let Some(url) = download_link {
        meta.set(MetaData::DOWNLOAD_LINK_KEY, url);
    }
    meta
}

/// Concatenate extracted structures into one `(frames, columns)` matrix.
///
/// `models` must follow registry order; every block must have `frames`
/// rows.
pub fn assemble(
    models: Vec<ExtractedModel>,
    frames: usize,
    repetition_time: f64,
    volume: VolumeGeometry,
    metadata: MetaData,
) -> Result<DenseSeries> {
    check_order(&models)?;
    if let Some(bad) = models.iter().find(|m| m.series.ncols() != m.count()) {
        return Err(Error::invalid(format!(
            "{} has {} indices but a {}-column block",
            bad.structure,
            bad.count(),
            bad.series.ncols()
        )));
    }
    if let Some(bad) = models.iter().find(|m| m.frames() != frames) {
        return Err(Error::FrameCountMismatch {
            structure: bad.structure.clone(),
            expected: frames,
            actual: bad.frames(),
        });
    }

    let counts: Vec<usize> = models.iter().map(ExtractedModel::count).collect();
    let ranges = allocate_offsets(&counts);
    let total = ranges.last().map_or(0, |r| r.end);

    let mut matrix = Array2::<f32>::zeros((frames, total));
    let mut brain_models = Vec::with_capacity(models.len());
    for (model, range) in models.into_iter().zip(ranges) {
        matrix.slice_mut(s![.., range.clone()]).assign(&model.series);
        brain_models.push(BrainModelEntry {
            structure: model.structure,
            index_offset: range.start,
            index_count: range.len(),
            indices: model.indices,
        });
    }

    debug!(frames, columns = total, models = brain_models.len(), "assembled dense series");
    Ok(DenseSeries {
        header: CiftiHeader {
            series: SeriesMap::seconds(frames, repetition_time),
            brain_models,
            volume: Some(volume),
            metadata,
        },
        matrix,
    })
}

/// Registry structures must appear in registry order.
fn check_order(models: &[ExtractedModel]) -> Result<()> {
    let mut last: Option<(usize, &str)> = None;
    for model in models {
        let pos = registry::position(&model.structure)
            .ok_or_else(|| Error::lookup(format!("{} is not a known structure", model.structure)))?;
        if let Some((prev, name)) = last {
            if pos <= prev {
                return Err(Error::invalid(format!(
                    "{} listed after {}, breaking structure order",
                    model.structure, name
                )));
            }
        }
        last = Some((pos, model.structure.as_str()));
    }
    Ok(())
}
