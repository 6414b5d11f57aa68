//! NIfTI-1 / NIfTI-2 volume codec.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Header           |  348 bytes (NIfTI-1) or 540 bytes (NIfTI-2)
//! +------------------+
//! | Extension flag   |  4 bytes ([1,0,0,0] when extensions follow)
//! +------------------+
//! | Extensions       |  esize (i32), ecode (i32), payload; 16-byte aligned
//! +------------------+
//! | Voxel data       |  at vox_offset, first axis fastest
//! +------------------+
//! ```

mod format;
mod header;
mod reader;
mod volume;
pub mod writer;

pub use format::*;
pub use header::{DataType, NiftiHeader, NiftiVersion};
pub use reader::{NiftiExtension, NiftiImage};
pub use volume::{LabelVolume, SeriesVolume};
pub use writer::{write_f32_volume, write_image, write_label_volume};
