//! NIfTI image reader.
//!
//! Uncompressed files are memory-mapped; gzip files are inflated into
//! memory. Either way the whole payload is available before decoding.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::DMat4;
use memmap2::Mmap;
use tracing::debug;

use super::format::EXTENDER_SIZE;
use super::header::{DataType, NiftiHeader};
use crate::core::{gunzip, is_gzip};
use crate::util::{Error, Result};

/// One header extension (`esize`, `ecode`, payload).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NiftiExtension {
    pub code: i32,
    /// Payload without the 8-byte size/code prefix, padding included.
    pub data: Vec<u8>,
}

impl NiftiExtension {
    pub fn new(code: i32, data: Vec<u8>) -> Self {
        Self { code, data }
    }
}

enum Payload {
    /// Memory-mapped file (uncompressed `.nii`)
    Mapped(Mmap),
    /// Inflated or otherwise owned bytes
    Owned(Vec<u8>),
}

impl Payload {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => mmap,
            Self::Owned(buf) => buf,
        }
    }
}

/// A NIfTI file held in memory: header, extensions, and raw voxel bytes.
pub struct NiftiImage {
    header: NiftiHeader,
    extensions: Vec<NiftiExtension>,
    payload: Payload,
}

impl NiftiImage {
    /// Open a `.nii` or `.nii.gz` file, memory-mapping when possible.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();

        let payload = if use_mmap && size > 0 {
            // Safety: the map is read-only and dropped with the image.
            let mmap = unsafe { Mmap::map(&file) }?;
            if is_gzip(&mmap) {
                Payload::Owned(gunzip(&mmap)?)
            } else {
                Payload::Mapped(mmap)
            }
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            if is_gzip(&buf) {
                Payload::Owned(gunzip(&buf)?)
            } else {
                Payload::Owned(buf)
            }
        };

        let image = Self::from_payload(payload)?;
        debug!(
            path = %path.display(),
            shape = ?image.header.shape(),
            datatype = ?image.header.datatype,
            extensions = image.extensions.len(),
            "opened NIfTI image"
        );
        Ok(image)
    }

    /// Parse an image from in-memory bytes (gzip allowed).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let bytes = if is_gzip(&bytes) { gunzip(&bytes)? } else { bytes };
        Self::from_payload(Payload::Owned(bytes))
    }

    fn from_payload(payload: Payload) -> Result<Self> {
        let bytes = payload.bytes();
        let header = NiftiHeader::parse(bytes)?;

        let end = header.vox_offset as usize + header.data_size();
        if bytes.len() < end {
            return Err(Error::invalid(format!(
                "voxel data truncated: need {} bytes, file has {}",
                end,
                bytes.len()
            )));
        }

        let extensions = if header.little_endian {
            parse_extensions::<LittleEndian>(bytes, &header)?
        } else {
            parse_extensions::<BigEndian>(bytes, &header)?
        };

        Ok(Self { header, extensions, payload })
    }

    #[inline]
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    #[inline]
    pub fn extensions(&self) -> &[NiftiExtension] {
        &self.extensions
    }

    /// First extension with the given code.
    pub fn extension(&self, code: i32) -> Option<&NiftiExtension> {
        self.extensions.iter().find(|e| e.code == code)
    }

    #[inline]
    pub fn shape(&self) -> Vec<usize> {
        self.header.shape()
    }

    #[inline]
    pub fn affine(&self) -> DMat4 {
        self.header.affine()
    }

    /// Raw voxel bytes in file byte order.
    pub fn raw_data(&self) -> &[u8] {
        let start = self.header.vox_offset as usize;
        &self.payload.bytes()[start..start + self.header.data_size()]
    }

    /// Decode every voxel to `f32`, scaling applied.
    pub fn read_f32(&self) -> Result<Vec<f32>> {
        self.decode(|v| v as f32)
    }

    /// Decode every voxel to an integer label, scaling applied and
    /// floating-point values rounded to nearest.
    pub fn read_labels(&self) -> Result<Vec<i32>> {
        self.decode(|v| v.round() as i32)
    }

    fn decode<T, F: Fn(f64) -> T>(&self, conv: F) -> Result<Vec<T>> {
        let header = &self.header;
        let scale = header.has_scaling().then_some((header.scl_slope, header.scl_inter));
        let apply = |v: f64| match scale {
            Some((slope, inter)) => conv(v * slope + inter),
            None => conv(v),
        };
        let raw = self.raw_data();
        let out = if header.little_endian {
            decode_values::<LittleEndian, _, _>(header.datatype, raw, apply)
        } else {
            decode_values::<BigEndian, _, _>(header.datatype, raw, apply)
        };
        Ok(out)
    }
}

fn parse_extensions<E: ByteOrder>(bytes: &[u8], header: &NiftiHeader) -> Result<Vec<NiftiExtension>> {
    let hsize = header.version.header_size();
    let vox_offset = header.vox_offset as usize;
    let mut extensions = Vec::new();

    if hsize + EXTENDER_SIZE > vox_offset || bytes[hsize] == 0 {
        return Ok(extensions);
    }

    let mut pos = hsize + EXTENDER_SIZE;
    while pos + 8 <= vox_offset {
        let esize = E::read_i32(&bytes[pos..pos + 4]);
        let ecode = E::read_i32(&bytes[pos + 4..pos + 8]);
        if esize < 8 || pos + esize as usize > vox_offset {
            return Err(Error::invalid(format!("bad extension size {} at {}", esize, pos)));
        }
        let end = pos + esize as usize;
        extensions.push(NiftiExtension::new(ecode, bytes[pos + 8..end].to_vec()));
        pos = end;
    }
    Ok(extensions)
}

fn decode_values<E: ByteOrder, T, F: Fn(f64) -> T>(dt: DataType, raw: &[u8], f: F) -> Vec<T> {
    match dt {
        DataType::UInt8 => raw.iter().map(|&v| f(v as f64)).collect(),
        DataType::Int8 => raw.iter().map(|&v| f(v as i8 as f64)).collect(),
        DataType::Int16 => raw.chunks_exact(2).map(|c| f(E::read_i16(c) as f64)).collect(),
        DataType::UInt16 => raw.chunks_exact(2).map(|c| f(E::read_u16(c) as f64)).collect(),
        DataType::Int32 => raw.chunks_exact(4).map(|c| f(E::read_i32(c) as f64)).collect(),
        DataType::UInt32 => raw.chunks_exact(4).map(|c| f(E::read_u32(c) as f64)).collect(),
        DataType::Int64 => raw.chunks_exact(8).map(|c| f(E::read_i64(c) as f64)).collect(),
        DataType::UInt64 => raw.chunks_exact(8).map(|c| f(E::read_u64(c) as f64)).collect(),
        DataType::Float32 => raw.chunks_exact(4).map(|c| f(E::read_f32(c) as f64)).collect(),
        DataType::Float64 => raw.chunks_exact(8).map(|c| f(E::read_f64(c))).collect(),
    }
}
