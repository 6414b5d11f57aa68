//! NIfTI header parsing and serialization.
//!
//! Both NIfTI-1 (348-byte) and NIfTI-2 (540-byte) headers are read in
//! either byte order. Headers are always written little-endian.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::DMat4;

use super::format::{self, v1, v2};
use crate::util::{affine_from_rows, affine_rows, quaternion_affine, scaling_affine, Error, Result};

/// NIfTI format version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NiftiVersion {
    #[default]
    Nifti1,
    Nifti2,
}

impl NiftiVersion {
    /// Header size in bytes for this version.
    pub const fn header_size(self) -> usize {
        match self {
            Self::Nifti1 => format::NIFTI1_HEADER_SIZE,
            Self::Nifti2 => format::NIFTI2_HEADER_SIZE,
        }
    }
}

/// Voxel data type codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i16)]
pub enum DataType {
    UInt8 = 2,
    Int16 = 4,
    Int32 = 8,
    Float32 = 16,
    Float64 = 64,
    Int8 = 256,
    UInt16 = 512,
    UInt32 = 768,
    Int64 = 1024,
    UInt64 = 1280,
}

impl DataType {
    /// Parse from the header `datatype` code.
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            2 => Ok(Self::UInt8),
            4 => Ok(Self::Int16),
            8 => Ok(Self::Int32),
            16 => Ok(Self::Float32),
            64 => Ok(Self::Float64),
            256 => Ok(Self::Int8),
            512 => Ok(Self::UInt16),
            768 => Ok(Self::UInt32),
            1024 => Ok(Self::Int64),
            1280 => Ok(Self::UInt64),
            _ => Err(Error::UnsupportedDataType(format!("NIfTI datatype code {}", code))),
        }
    }

    /// Header `datatype` code.
    #[inline]
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// Size of each element in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Check for a floating-point type.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

/// Unified NIfTI header.
///
/// Fields are widened to the NIfTI-2 representation (64-bit dims, f64).
#[derive(Clone, Debug, PartialEq)]
pub struct NiftiHeader {
    pub version: NiftiVersion,
    /// `dim[0]` is the rank, `dim[1..=rank]` the sizes.
    pub dim: [i64; 8],
    pub datatype: DataType,
    /// `pixdim[0]` is qfac, `pixdim[1..]` voxel sizes and step.
    pub pixdim: [f64; 8],
    pub vox_offset: i64,
    pub scl_slope: f64,
    pub scl_inter: f64,
    pub xyzt_units: u8,
    pub intent_code: i32,
    pub intent_name: String,
    pub descrip: String,
    pub qform_code: i32,
    pub sform_code: i32,
    pub quatern: [f64; 3],
    pub qoffset: [f64; 3],
    /// First three rows of the sform affine.
    pub srow: [[f64; 4]; 3],
    /// Byte order of the file the header came from.
    pub little_endian: bool,
}

impl Default for NiftiHeader {
    fn default() -> Self {
        Self {
            version: NiftiVersion::Nifti1,
            dim: [3, 1, 1, 1, 1, 1, 1, 1],
            datatype: DataType::Float32,
            pixdim: [1.0; 8],
            vox_offset: 0,
            scl_slope: 1.0,
            scl_inter: 0.0,
            xyzt_units: 0,
            intent_code: 0,
            intent_name: String::new(),
            descrip: String::new(),
            qform_code: 0,
            sform_code: 0,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            srow: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            little_endian: true,
        }
    }
}

impl NiftiHeader {
    /// Header for a volume of the given shape and type.
    pub fn with_shape(version: NiftiVersion, shape: &[usize], datatype: DataType) -> Self {
        let mut header = Self { version, datatype, ..Self::default() };
        header.set_shape(shape);
        header
    }

    /// Read a header with automatic version and endianness detection.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::invalid("header too short to detect version"));
        }

        let le = LittleEndian::read_i32(&bytes[0..4]);
        let be = BigEndian::read_i32(&bytes[0..4]);
        let (version, little_endian) = match (le, be) {
            (348, _) => (NiftiVersion::Nifti1, true),
            (_, 348) => (NiftiVersion::Nifti1, false),
            (540, _) => (NiftiVersion::Nifti2, true),
            (_, 540) => (NiftiVersion::Nifti2, false),
            _ => return Err(Error::InvalidMagic(bytes[0..4].to_vec())),
        };

        if bytes.len() < version.header_size() {
            return Err(Error::invalid(format!(
                "header truncated: {} of {} bytes",
                bytes.len(),
                version.header_size()
            )));
        }

        match (version, little_endian) {
            (NiftiVersion::Nifti1, true) => Self::parse_v1::<LittleEndian>(bytes),
            (NiftiVersion::Nifti1, false) => Self::parse_v1::<BigEndian>(bytes),
            (NiftiVersion::Nifti2, true) => Self::parse_v2::<LittleEndian>(bytes),
            (NiftiVersion::Nifti2, false) => Self::parse_v2::<BigEndian>(bytes),
        }
    }

    fn parse_v1<E: ByteOrder>(bytes: &[u8]) -> Result<Self> {
        let magic = &bytes[v1::MAGIC..v1::MAGIC + 4];
        if magic != format::NIFTI1_MAGIC {
            return Err(Error::InvalidMagic(magic.to_vec()));
        }

        let mut dim = [0i64; 8];
        for (i, d) in dim.iter_mut().enumerate() {
            let at = v1::DIM + i * 2;
            *d = E::read_i16(&bytes[at..at + 2]) as i64;
        }
        let mut pixdim = [0.0f64; 8];
        for (i, p) in pixdim.iter_mut().enumerate() {
            let at = v1::PIXDIM + i * 4;
            *p = E::read_f32(&bytes[at..at + 4]) as f64;
        }
        let mut srow = [[0.0f64; 4]; 3];
        for (r, row) in srow.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                let at = v1::SROW_X + (r * 4 + c) * 4;
                *v = E::read_f32(&bytes[at..at + 4]) as f64;
            }
        }
        let read3 = |base: usize| -> [f64; 3] {
            [
                E::read_f32(&bytes[base..base + 4]) as f64,
                E::read_f32(&bytes[base + 4..base + 8]) as f64,
                E::read_f32(&bytes[base + 8..base + 12]) as f64,
            ]
        };

        let header = Self {
            version: NiftiVersion::Nifti1,
            dim,
            datatype: DataType::from_code(E::read_i16(&bytes[v1::DATATYPE..v1::DATATYPE + 2]))?,
            pixdim,
            vox_offset: E::read_f32(&bytes[v1::VOX_OFFSET..v1::VOX_OFFSET + 4]) as i64,
            scl_slope: E::read_f32(&bytes[v1::SCL_SLOPE..v1::SCL_SLOPE + 4]) as f64,
            scl_inter: E::read_f32(&bytes[v1::SCL_INTER..v1::SCL_INTER + 4]) as f64,
            xyzt_units: bytes[v1::XYZT_UNITS],
            intent_code: E::read_i16(&bytes[v1::INTENT_CODE..v1::INTENT_CODE + 2]) as i32,
            intent_name: read_cstr(&bytes[v1::INTENT_NAME..v1::INTENT_NAME + format::INTENT_NAME_LEN]),
            descrip: read_cstr(&bytes[v1::DESCRIP..v1::DESCRIP + format::DESCRIP_LEN]),
            qform_code: E::read_i16(&bytes[v1::QFORM_CODE..v1::QFORM_CODE + 2]) as i32,
            sform_code: E::read_i16(&bytes[v1::SFORM_CODE..v1::SFORM_CODE + 2]) as i32,
            quatern: read3(v1::QUATERN_B),
            qoffset: read3(v1::QOFFSET_X),
            srow,
            little_endian: is_little::<E>(),
        };
        header.validate(E::read_i16(&bytes[v1::BITPIX..v1::BITPIX + 2]))?;
        Ok(header)
    }

    fn parse_v2<E: ByteOrder>(bytes: &[u8]) -> Result<Self> {
        let magic = &bytes[v2::MAGIC..v2::MAGIC + 8];
        if magic != format::NIFTI2_MAGIC {
            return Err(Error::InvalidMagic(magic.to_vec()));
        }

        let mut dim = [0i64; 8];
        for (i, d) in dim.iter_mut().enumerate() {
            let at = v2::DIM + i * 8;
            *d = E::read_i64(&bytes[at..at + 8]);
        }
        let mut pixdim = [0.0f64; 8];
        for (i, p) in pixdim.iter_mut().enumerate() {
            let at = v2::PIXDIM + i * 8;
            *p = E::read_f64(&bytes[at..at + 8]);
        }
        let mut srow = [[0.0f64; 4]; 3];
        for (r, row) in srow.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                let at = v2::SROW_X + (r * 4 + c) * 8;
                *v = E::read_f64(&bytes[at..at + 8]);
            }
        }
        let read3 = |base: usize| -> [f64; 3] {
            [
                E::read_f64(&bytes[base..base + 8]),
                E::read_f64(&bytes[base + 8..base + 16]),
                E::read_f64(&bytes[base + 16..base + 24]),
            ]
        };

        let header = Self {
            version: NiftiVersion::Nifti2,
            dim,
            datatype: DataType::from_code(E::read_i16(&bytes[v2::DATATYPE..v2::DATATYPE + 2]))?,
            pixdim,
            vox_offset: E::read_i64(&bytes[v2::VOX_OFFSET..v2::VOX_OFFSET + 8]),
            scl_slope: E::read_f64(&bytes[v2::SCL_SLOPE..v2::SCL_SLOPE + 8]),
            scl_inter: E::read_f64(&bytes[v2::SCL_INTER..v2::SCL_INTER + 8]),
            xyzt_units: E::read_i32(&bytes[v2::XYZT_UNITS..v2::XYZT_UNITS + 4]) as u8,
            intent_code: E::read_i32(&bytes[v2::INTENT_CODE..v2::INTENT_CODE + 4]),
            intent_name: read_cstr(&bytes[v2::INTENT_NAME..v2::INTENT_NAME + format::INTENT_NAME_LEN]),
            descrip: read_cstr(&bytes[v2::DESCRIP..v2::DESCRIP + format::DESCRIP_LEN]),
            qform_code: E::read_i32(&bytes[v2::QFORM_CODE..v2::QFORM_CODE + 4]),
            sform_code: E::read_i32(&bytes[v2::SFORM_CODE..v2::SFORM_CODE + 4]),
            quatern: read3(v2::QUATERN_B),
            qoffset: read3(v2::QOFFSET_X),
            srow,
            little_endian: is_little::<E>(),
        };
        header.validate(E::read_i16(&bytes[v2::BITPIX..v2::BITPIX + 2]))?;
        Ok(header)
    }

    fn validate(&self, bitpix: i16) -> Result<()> {
        let rank = self.dim[0];
        if !(1..=7).contains(&rank) {
            return Err(Error::invalid(format!("dim[0] must be 1..=7, got {}", rank)));
        }
        if let Some(d) = self.dim[1..=rank as usize].iter().find(|&&d| d < 0) {
            return Err(Error::invalid(format!("negative dimension {}", d)));
        }
        let expected = (self.datatype.byte_size() * 8) as i16;
        if bitpix != expected {
            return Err(Error::invalid(format!(
                "bitpix {} does not match datatype {:?} (expected {})",
                bitpix, self.datatype, expected
            )));
        }
        if self.vox_offset < self.version.header_size() as i64 {
            return Err(Error::invalid(format!("vox_offset {} inside header", self.vox_offset)));
        }
        Ok(())
    }

    /// Rank of the data array.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.dim[0].clamp(0, 7) as usize
    }

    /// Sizes of the data array, `dim[1..=ndim]`.
    pub fn shape(&self) -> Vec<usize> {
        self.dim[1..=self.ndim()].iter().map(|&d| d.max(0) as usize).collect()
    }

    /// Replace the data shape.
    pub fn set_shape(&mut self, shape: &[usize]) {
        self.dim = [1; 8];
        self.dim[0] = shape.len() as i64;
        for (d, &s) in self.dim[1..].iter_mut().zip(shape) {
            *d = s as i64;
        }
    }

    /// Number of elements in the data array.
    pub fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }

    /// Number of payload bytes.
    pub fn data_size(&self) -> usize {
        self.num_elements() * self.datatype.byte_size()
    }

    /// Whether `scl_slope`/`scl_inter` change the stored values.
    pub fn has_scaling(&self) -> bool {
        self.scl_slope != 0.0 && self.scl_slope.is_finite()
            && !(self.scl_slope == 1.0 && self.scl_inter == 0.0)
    }

    /// Voxel sizes along the three spatial axes.
    pub fn voxel_size(&self) -> [f64; 3] {
        [self.pixdim[1], self.pixdim[2], self.pixdim[3]]
    }

    /// Voxel-to-world affine: sform, then qform, then pixdim scaling.
    pub fn affine(&self) -> DMat4 {
        if self.sform_code > 0 {
            let [x, y, z] = self.srow;
            affine_from_rows([x, y, z, [0.0, 0.0, 0.0, 1.0]])
        } else if self.qform_code > 0 {
            quaternion_affine(self.quatern, self.qoffset, self.voxel_size(), self.pixdim[0])
        } else {
            scaling_affine(self.voxel_size())
        }
    }

    /// Store `affine` as the sform (code 1 = scanner anatomical when unset).
    pub fn set_affine(&mut self, affine: &DMat4) {
        let rows = affine_rows(affine);
        self.srow = [rows[0], rows[1], rows[2]];
        if self.sform_code <= 0 {
            self.sform_code = 1;
        }
        for (axis, p) in self.pixdim[1..4].iter_mut().enumerate() {
            *p = (rows[0][axis].powi(2) + rows[1][axis].powi(2) + rows[2][axis].powi(2)).sqrt();
        }
    }

    /// Serialize as little-endian bytes of this header's version.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.version {
            NiftiVersion::Nifti1 => self.to_bytes_v1(),
            NiftiVersion::Nifti2 => self.to_bytes_v2(),
        }
    }

    fn to_bytes_v1(&self) -> Vec<u8> {
        type E = LittleEndian;
        let mut buf = vec![0u8; format::NIFTI1_HEADER_SIZE];

        E::write_i32(&mut buf[v1::SIZEOF_HDR..v1::SIZEOF_HDR + 4], format::NIFTI1_HEADER_SIZE as i32);
        for (i, &d) in self.dim.iter().enumerate() {
            let at = v1::DIM + i * 2;
            E::write_i16(&mut buf[at..at + 2], d.clamp(0, i16::MAX as i64) as i16);
        }
        E::write_i16(&mut buf[v1::INTENT_CODE..v1::INTENT_CODE + 2], self.intent_code as i16);
        E::write_i16(&mut buf[v1::DATATYPE..v1::DATATYPE + 2], self.datatype.code());
        E::write_i16(&mut buf[v1::BITPIX..v1::BITPIX + 2], (self.datatype.byte_size() * 8) as i16);
        for (i, &p) in self.pixdim.iter().enumerate() {
            let at = v1::PIXDIM + i * 4;
            E::write_f32(&mut buf[at..at + 4], p as f32);
        }
        E::write_f32(&mut buf[v1::VOX_OFFSET..v1::VOX_OFFSET + 4], self.vox_offset as f32);
        E::write_f32(&mut buf[v1::SCL_SLOPE..v1::SCL_SLOPE + 4], self.scl_slope as f32);
        E::write_f32(&mut buf[v1::SCL_INTER..v1::SCL_INTER + 4], self.scl_inter as f32);
        buf[v1::XYZT_UNITS] = self.xyzt_units;
        write_cstr(&mut buf[v1::DESCRIP..v1::DESCRIP + format::DESCRIP_LEN], &self.descrip);
        E::write_i16(&mut buf[v1::QFORM_CODE..v1::QFORM_CODE + 2], self.qform_code as i16);
        E::write_i16(&mut buf[v1::SFORM_CODE..v1::SFORM_CODE + 2], self.sform_code as i16);
        for i in 0..3 {
            let at = v1::QUATERN_B + i * 4;
            E::write_f32(&mut buf[at..at + 4], self.quatern[i] as f32);
            let at = v1::QOFFSET_X + i * 4;
            E::write_f32(&mut buf[at..at + 4], self.qoffset[i] as f32);
        }
        for (r, row) in self.srow.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                let at = v1::SROW_X + (r * 4 + c) * 4;
                E::write_f32(&mut buf[at..at + 4], v as f32);
            }
        }
        write_cstr(&mut buf[v1::INTENT_NAME..v1::INTENT_NAME + format::INTENT_NAME_LEN], &self.intent_name);
        buf[v1::MAGIC..v1::MAGIC + 4].copy_from_slice(format::NIFTI1_MAGIC);
        buf
    }

    fn to_bytes_v2(&self) -> Vec<u8> {
        type E = LittleEndian;
        let mut buf = vec![0u8; format::NIFTI2_HEADER_SIZE];

        E::write_i32(&mut buf[v2::SIZEOF_HDR..v2::SIZEOF_HDR + 4], format::NIFTI2_HEADER_SIZE as i32);
        buf[v2::MAGIC..v2::MAGIC + 8].copy_from_slice(format::NIFTI2_MAGIC);
        E::write_i16(&mut buf[v2::DATATYPE..v2::DATATYPE + 2], self.datatype.code());
        E::write_i16(&mut buf[v2::BITPIX..v2::BITPIX + 2], (self.datatype.byte_size() * 8) as i16);
        for (i, &d) in self.dim.iter().enumerate() {
            let at = v2::DIM + i * 8;
            E::write_i64(&mut buf[at..at + 8], d);
        }
        for (i, &p) in self.pixdim.iter().enumerate() {
            let at = v2::PIXDIM + i * 8;
            E::write_f64(&mut buf[at..at + 8], p);
        }
        E::write_i64(&mut buf[v2::VOX_OFFSET..v2::VOX_OFFSET + 8], self.vox_offset);
        E::write_f64(&mut buf[v2::SCL_SLOPE..v2::SCL_SLOPE + 8], self.scl_slope);
        E::write_f64(&mut buf[v2::SCL_INTER..v2::SCL_INTER + 8], self.scl_inter);
        write_cstr(&mut buf[v2::DESCRIP..v2::DESCRIP + format::DESCRIP_LEN], &self.descrip);
        E::write_i32(&mut buf[v2::QFORM_CODE..v2::QFORM_CODE + 4], self.qform_code);
        E::write_i32(&mut buf[v2::SFORM_CODE..v2::SFORM_CODE + 4], self.sform_code);
        for i in 0..3 {
            let at = v2::QUATERN_B + i * 8;
            E::write_f64(&mut buf[at..at + 8], self.quatern[i]);
            let at = v2::QOFFSET_X + i * 8;
            E::write_f64(&mut buf[at..at + 8], self.qoffset[i]);
        }
        for (r, row) in self.srow.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                let at = v2::SROW_X + (r * 4 + c) * 8;
                E::write_f64(&mut buf[at..at + 8], v);
            }
        }
        E::write_i32(&mut buf[v2::XYZT_UNITS..v2::XYZT_UNITS + 4], self.xyzt_units as i32);
        E::write_i32(&mut buf[v2::INTENT_CODE..v2::INTENT_CODE + 4], self.intent_code);
        write_cstr(&mut buf[v2::INTENT_NAME..v2::INTENT_NAME + format::INTENT_NAME_LEN], &self.intent_name);
        buf
    }
}

#[inline]
fn is_little<E: ByteOrder>() -> bool {
    E::read_u16(&[1, 0]) == 1
}

/// NUL-terminated fixed-width string field.
fn read_cstr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Copy `s` into a fixed-width field, truncating and keeping one NUL.
fn write_cstr(field: &mut [u8], s: &str) {
    let n = s.len().min(field.len().saturating_sub(1));
    field[..n].copy_from_slice(&s.as_bytes()[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(version: NiftiVersion) -> NiftiHeader {
        let mut header = NiftiHeader::with_shape(version, &[4, 5, 6, 7], DataType::Int16);
        header.vox_offset = version.header_size() as i64 + 4;
        header.descrip = "bold".into();
        header.set_affine(&affine_from_rows([
            [-2.0, 0.0, 0.0, 90.0],
            [0.0, 2.0, 0.0, -126.0],
            [0.0, 0.0, 2.0, -72.0],
            [0.0, 0.0, 0.0, 1.0],
        ]));
        header
    }

    #[test]
    fn test_v1_roundtrip() {
        let header = sample_header(NiftiVersion::Nifti1);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 348);

        let parsed = NiftiHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.version, NiftiVersion::Nifti1);
        assert_eq!(parsed.shape(), vec![4, 5, 6, 7]);
        assert_eq!(parsed.datatype, DataType::Int16);
        assert_eq!(parsed.descrip, "bold");
        assert_eq!(affine_rows(&parsed.affine())[0], [-2.0, 0.0, 0.0, 90.0]);
        assert_eq!(parsed.voxel_size(), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_v2_roundtrip() {
        let mut header = sample_header(NiftiVersion::Nifti2);
        header.intent_code = format::INTENT_CONNECTIVITY_DENSE_SERIES;
        header.intent_name = format::INTENT_NAME_DENSE_SERIES.into();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 540);

        let parsed = NiftiHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.version, NiftiVersion::Nifti2);
        assert_eq!(parsed.intent_name, "ConnDenseSeries");
        assert_eq!(parsed.intent_code, 3002);
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_big_endian_v1() {
        let le = sample_header(NiftiVersion::Nifti1).to_bytes();
        // Re-encode the fields we check in big-endian order.
        let mut be = le.clone();
        BigEndian::write_i32(&mut be[0..4], 348);
        for i in 0..8 {
            let at = v1::DIM + i * 2;
            let v = LittleEndian::read_i16(&le[at..at + 2]);
            BigEndian::write_i16(&mut be[at..at + 2], v);
        }
        for at in [v1::DATATYPE, v1::BITPIX, v1::QFORM_CODE, v1::SFORM_CODE, v1::INTENT_CODE] {
            let v = LittleEndian::read_i16(&le[at..at + 2]);
            BigEndian::write_i16(&mut be[at..at + 2], v);
        }
        for i in 0..(4 * 8 + 4 * 3 + 4 * 3 + 3) {
            let at = match i {
                0..=7 => v1::PIXDIM + i * 4,
                8..=19 => v1::SROW_X + (i - 8) * 4,
                20..=22 => v1::QUATERN_B + (i - 20) * 4,
                23..=25 => v1::QOFFSET_X + (i - 23) * 4,
                26 => v1::VOX_OFFSET,
                27 => v1::SCL_SLOPE,
                28 => v1::SCL_INTER,
                _ => continue,
            };
            let v = LittleEndian::read_f32(&le[at..at + 4]);
            BigEndian::write_f32(&mut be[at..at + 4], v);
        }

        let parsed = NiftiHeader::parse(&be).unwrap();
        assert!(!parsed.little_endian);
        assert_eq!(parsed.shape(), vec![4, 5, 6, 7]);
        assert_eq!(affine_rows(&parsed.affine())[1], [0.0, 2.0, 0.0, -126.0]);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_header(NiftiVersion::Nifti1).to_bytes();
        bytes[v1::MAGIC] = b'x';
        assert!(matches!(NiftiHeader::parse(&bytes), Err(Error::InvalidMagic(_))));

        assert!(matches!(NiftiHeader::parse(&[0u8; 16]), Err(Error::InvalidMagic(_))));
    }

    #[test]
    fn test_affine_fallbacks() {
        let mut header = NiftiHeader::with_shape(NiftiVersion::Nifti1, &[2, 2, 2], DataType::UInt8);
        header.pixdim = [1.0, 3.0, 3.0, 4.0, 1.0, 1.0, 1.0, 1.0];
        assert_eq!(affine_rows(&header.affine())[2], [0.0, 0.0, 4.0, 0.0]);

        header.qform_code = 1;
        header.qoffset = [10.0, 20.0, 30.0];
        assert_eq!(affine_rows(&header.affine())[0], [3.0, 0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_scaling_flags() {
        let mut header = NiftiHeader::default();
        assert!(!header.has_scaling());
        header.scl_slope = 0.0;
        assert!(!header.has_scaling());
        header.scl_slope = 2.0;
        assert!(header.has_scaling());
    }
}
