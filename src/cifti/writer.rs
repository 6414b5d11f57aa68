//! Dense series serializer (`.dtseries.nii`).
//!
//! The matrix is stored as a NIfTI-2 image of shape
//! `[1, 1, 1, 1, frames, columns]` with the CIFTI XML in an extension.

use std::path::{Path, PathBuf};

use tracing::info;

use super::model::DenseSeries;
use super::xml::write_cifti_xml;
use crate::nifti::writer::{encode_image, f32_bytes, write_image};
use crate::nifti::{
    DataType, NiftiExtension, NiftiHeader, NiftiVersion, ECODE_CIFTI, INTENT_CONNECTIVITY_DENSE_SERIES,
    INTENT_NAME_DENSE_SERIES,
};
use crate::util::{Error, Result};

/// Conventional suffix of dense time series files.
pub const DTSERIES_SUFFIX: &str = ".dtseries.nii";

/// File name without directory and without `.nii.gz` / `.nii` (or any
/// other final extension).
pub fn output_base_name(input: &Path) -> Result<String> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::invalid(format!("no file name in {}", input.display())))?;
    let base = if let Some(stem) = name.strip_suffix(".nii.gz") {
        stem
    } else if let Some(stem) = name.strip_suffix(".nii") {
        stem
    } else {
        Path::new(name).file_stem().and_then(|s| s.to_str()).unwrap_or(name)
    };
    Ok(base.to_string())
}

/// Output path for `base` inside `out_dir`.
pub fn output_path(out_dir: &Path, base: &str) -> PathBuf {
    out_dir.join(format!("{}{}", base, DTSERIES_SUFFIX))
}

/// Header, extension and payload for a dense series.
fn prepare(dense: &DenseSeries) -> Result<(NiftiHeader, NiftiExtension, Vec<u8>)> {
    let (frames, columns) = dense.matrix.dim();
    if frames != dense.header.num_frames() || columns != dense.header.num_columns() {
        return Err(Error::invalid(format!(
            "matrix is {}x{}, header describes {}x{}",
            frames,
            columns,
            dense.header.num_frames(),
            dense.header.num_columns()
        )));
    }

    let mut header = NiftiHeader::with_shape(NiftiVersion::Nifti2, &[1, 1, 1, 1, frames, columns], DataType::Float32);
    header.intent_code = INTENT_CONNECTIVITY_DENSE_SERIES;
    header.intent_name = INTENT_NAME_DENSE_SERIES.to_string();

    let extension = NiftiExtension::new(ECODE_CIFTI, write_cifti_xml(&dense.header)?);

    // Frame index varies fastest: (t, c) lands at c * frames + t.
    let values: Vec<f32> = dense.matrix.t().iter().copied().collect();
    Ok((header, extension, f32_bytes(&values)))
}

/// Complete file contents of a dense series.
pub fn encode_dense_series(dense: &DenseSeries) -> Result<Vec<u8>> {
    let (header, extension, data) = prepare(dense)?;
    Ok(encode_image(&header, &[extension], &data))
}

/// Write a dense series to `path`.
pub fn write_dense_series(dense: &DenseSeries, path: impl AsRef<Path>) -> Result<()> {
    let (header, extension, data) = prepare(dense)?;
    write_image(path, &header, &[extension], &data)
}

/// Write `<out_dir>/<base>.dtseries.nii`, where `base` is derived from
/// `source`. Returns the base name.
pub fn save_dense_series(dense: &DenseSeries, out_dir: &Path, source: &Path) -> Result<String> {
    let base = output_base_name(source)?;
    let path = output_path(out_dir, &base);
    write_dense_series(dense, &path)?;
    info!(
        path = %path.display(),
        frames = dense.header.num_frames(),
        columns = dense.header.num_columns(),
        "wrote dense series"
    );
    Ok(base)
}
