//! NIfTI format constants and header field offsets.

/// Single-file NIfTI-1 magic (`.nii`).
pub const NIFTI1_MAGIC: &[u8; 4] = b"n+1\0";

/// Single-file NIfTI-2 magic (`.nii`).
pub const NIFTI2_MAGIC: &[u8; 8] = b"n+2\0\r\n\x1a\n";

/// `sizeof_hdr` value of a NIfTI-1 header.
pub const NIFTI1_HEADER_SIZE: usize = 348;

/// `sizeof_hdr` value of a NIfTI-2 header.
pub const NIFTI2_HEADER_SIZE: usize = 540;

/// Size of the extension flag that follows the header.
pub const EXTENDER_SIZE: usize = 4;

/// Extension sizes are padded to a multiple of this.
pub const EXTENSION_ALIGN: usize = 16;

/// Extension code of a CIFTI XML header.
pub const ECODE_CIFTI: i32 = 32;

/// Intent code of a CIFTI dense time series.
pub const INTENT_CONNECTIVITY_DENSE_SERIES: i32 = 3002;

/// `intent_name` of a CIFTI dense time series.
pub const INTENT_NAME_DENSE_SERIES: &str = "ConnDenseSeries";

/// NIfTI-1 header field byte offsets.
pub(crate) mod v1 {
    pub const SIZEOF_HDR: usize = 0;
    pub const DIM: usize = 40;
    pub const INTENT_CODE: usize = 68;
    pub const DATATYPE: usize = 70;
    pub const BITPIX: usize = 72;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const SCL_INTER: usize = 116;
    pub const XYZT_UNITS: usize = 123;
    pub const DESCRIP: usize = 148;
    pub const QFORM_CODE: usize = 252;
    pub const SFORM_CODE: usize = 254;
    pub const QUATERN_B: usize = 256;
    pub const QOFFSET_X: usize = 268;
    pub const SROW_X: usize = 280;
    pub const INTENT_NAME: usize = 328;
    pub const MAGIC: usize = 344;
}

/// NIfTI-2 header field byte offsets.
pub(crate) mod v2 {
    pub const SIZEOF_HDR: usize = 0;
    pub const MAGIC: usize = 4;
    pub const DATATYPE: usize = 12;
    pub const BITPIX: usize = 14;
    pub const DIM: usize = 16;
    pub const PIXDIM: usize = 104;
    pub const VOX_OFFSET: usize = 168;
    pub const SCL_SLOPE: usize = 176;
    pub const SCL_INTER: usize = 184;
    pub const DESCRIP: usize = 240;
    pub const QFORM_CODE: usize = 344;
    pub const SFORM_CODE: usize = 348;
    pub const QUATERN_B: usize = 352;
    pub const QOFFSET_X: usize = 376;
    pub const SROW_X: usize = 400;
    pub const XYZT_UNITS: usize = 500;
    pub const INTENT_CODE: usize = 504;
    pub const INTENT_NAME: usize = 508;
}

/// Length of the `descrip` field.
pub const DESCRIP_LEN: usize = 80;

/// Length of the `intent_name` field.
pub const INTENT_NAME_LEN: usize = 16;

/// Round `len` up to the extension alignment.
#[inline]
pub const fn pad_to_extension(len: usize) -> usize {
    len.div_ceil(EXTENSION_ALIGN) * EXTENSION_ALIGN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(NIFTI1_MAGIC.len(), 4);
        assert_eq!(NIFTI2_MAGIC.len(), 8);
        assert_eq!(&NIFTI2_MAGIC[..3], b"n+2");
    }

    #[test]
    fn test_v2_layout_fits_header() {
        assert!(v2::INTENT_NAME + INTENT_NAME_LEN <= NIFTI2_HEADER_SIZE);
        assert!(v1::MAGIC + 4 == NIFTI1_HEADER_SIZE);
    }

    #[test]
    fn test_extension_padding() {
        assert_eq!(pad_to_extension(0), 0);
        assert_eq!(pad_to_extension(1), 16);
        assert_eq!(pad_to_extension(16), 16);
        assert_eq!(pad_to_extension(17), 32);
    }
}
