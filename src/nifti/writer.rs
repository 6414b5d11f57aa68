//! NIfTI image writer.
//!
//! Files are laid out as header, extension flag, extensions (each padded to
//! 16 bytes), then voxel data at `vox_offset`. Paths ending in `.gz` are
//! gzip-compressed.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use glam::DMat4;
use tracing::debug;

use super::format::{pad_to_extension, EXTENDER_SIZE};
use super::header::{DataType, NiftiHeader, NiftiVersion};
use super::reader::NiftiExtension;
use crate::core::gzip;
use crate::util::{Error, Result};

/// Buffered output stream with position tracking.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create a new output stream for the given file path.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(2 * 1024 * 1024, file), // 2MB buffer
            pos: 0,
        })
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Flush the buffer to disk.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Offset of the voxel data for a header version and extension list.
pub fn data_offset(version: NiftiVersion, extensions: &[NiftiExtension]) -> usize {
    version.header_size()
        + EXTENDER_SIZE
        + extensions.iter().map(|e| pad_to_extension(e.data.len() + 8)).sum::<usize>()
}

/// Serialize header, extensions, and data into one buffer.
///
/// `vox_offset` is recomputed from the extensions.
pub fn encode_image(header: &NiftiHeader, extensions: &[NiftiExtension], data: &[u8]) -> Vec<u8> {
    let mut header = header.clone();
    header.vox_offset = data_offset(header.version, extensions) as i64;

    let mut buf = Vec::with_capacity(header.vox_offset as usize + data.len());
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(&[u8::from(!extensions.is_empty()), 0, 0, 0]);
    for ext in extensions {
        let esize = pad_to_extension(ext.data.len() + 8);
        let mut prefix = [0u8; 8];
        LittleEndian::write_i32(&mut prefix[0..4], esize as i32);
        LittleEndian::write_i32(&mut prefix[4..8], ext.code);
        buf.extend_from_slice(&prefix);
        buf.extend_from_slice(&ext.data);
        buf.resize(buf.len() + esize - 8 - ext.data.len(), 0);
    }
    buf.extend_from_slice(data);
    buf
}

/// Write a NIfTI file. I/O faults are reported as [`Error::Write`].
pub fn write_image(
    path: impl AsRef<Path>,
    header: &NiftiHeader,
    extensions: &[NiftiExtension],
    data: &[u8],
) -> Result<()> {
    let path = path.as_ref();
    if data.len() != header.data_size() {
        return Err(Error::invalid(format!(
            "payload has {} bytes, header describes {}",
            data.len(),
            header.data_size()
        )));
    }

    let encoded = encode_image(header, extensions, data);
    let bytes = if path.extension().is_some_and(|e| e == "gz") {
        gzip(&encoded, 6)?
    } else {
        encoded
    };

    let mut stream = OStream::create(path).map_err(|e| Error::write(path, e))?;
    stream.write_bytes(&bytes).map_err(|e| Error::write(path, e))?;
    stream.flush().map_err(|e| Error::write(path, e))?;
    debug!(path = %path.display(), bytes = stream.pos(), "wrote NIfTI image");
    Ok(())
}

/// Little-endian bytes of `f32` values.
pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * 4];
    LittleEndian::write_f32_into(values, &mut buf);
    buf
}

/// Little-endian bytes of `i32` values.
pub fn i32_bytes(values: &[i32]) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * 4];
    LittleEndian::write_i32_into(values, &mut buf);
    buf
}

/// Write a FLOAT32 volume (NIfTI order, first axis fastest).
pub fn write_f32_volume(
    path: impl AsRef<Path>,
    version: NiftiVersion,
    shape: &[usize],
    affine: &DMat4,
    data: &[f32],
) -> Result<()> {
    let mut header = NiftiHeader::with_shape(version, shape, DataType::Float32);
    header.set_affine(affine);
    write_image(path, &header, &[], &f32_bytes(data))
}

/// Write an INT32 label volume.
pub fn write_label_volume(
    path: impl AsRef<Path>,
    shape: [usize; 3],
    affine: &DMat4,
    labels: &[i32],
) -> Result<()> {
    let mut header = NiftiHeader::with_shape(NiftiVersion::Nifti1, &shape, DataType::Int32);
    header.set_affine(affine);
    write_image(path, &header, &[], &i32_bytes(labels))
}
