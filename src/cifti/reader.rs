//! Dense series reader.

use std::path::Path;

use ndarray::{Array2, ShapeBuilder};
use tracing::debug;

use super::model::DenseSeries;
use super::xml::parse_cifti_xml;
use crate::nifti::{NiftiImage, ECODE_CIFTI};
use crate::util::{Error, Result};

/// Read a `.dtseries.nii` file back into matrix and header.
pub fn read_dense_series(path: impl AsRef<Path>) -> Result<DenseSeries> {
    let path = path.as_ref();
    let dense = from_image(&NiftiImage::open(path)?)?;
    debug!(
        path = %path.display(),
        frames = dense.header.num_frames(),
        columns = dense.header.num_columns(),
        "read dense series"
    );
    Ok(dense)
}

/// Decode a dense series held in memory.
pub fn decode_dense_series(bytes: Vec<u8>) -> Result<DenseSeries> {
    from_image(&NiftiImage::from_bytes(bytes)?)
}

fn from_image(image: &NiftiImage) -> Result<DenseSeries> {
    let extension = image
        .extension(ECODE_CIFTI)
        .ok_or_else(|| Error::invalid("no CIFTI extension in NIfTI header"))?;
    let header = parse_cifti_xml(&extension.data)?;

    let shape = image.shape();
    let (frames, columns) = match shape.as_slice() {
        &[1, 1, 1, 1, frames, columns] => (frames, columns),
        other => return Err(Error::invalid(format!("dense series shape {:?} is not [1,1,1,1,t,c]", other))),
    };
    if frames != header.num_frames() || columns != header.num_columns() {
        return Err(Error::invalid(format!(
            "data is {}x{}, CIFTI header describes {}x{}",
            frames,
            columns,
            header.num_frames(),
            header.num_columns()
        )));
    }

    let matrix = Array2::from_shape_vec((frames, columns).f(), image.read_f32()?)
        .map_err(|e| Error::invalid(format!("dense series payload: {}", e)))?;
    Ok(DenseSeries { header, matrix })
}
