//! Cortical surface inputs: FreeSurfer annotations and GIFTI series.

mod annot;
mod gifti;

pub use annot::{Annotation, ColorTableEntry};
pub use gifti::{SurfaceSeries, ANATOMICAL_STRUCTURE_PRIMARY};

use std::fmt;

/// Cortical hemisphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    Left,
    Right,
}

impl Hemisphere {
    pub const ALL: [Hemisphere; 2] = [Hemisphere::Left, Hemisphere::Right];

    /// FreeSurfer file prefix (`lh` / `rh`).
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Left => "lh",
            Self::Right => "rh",
        }
    }

    /// GIFTI `AnatomicalStructurePrimary` value.
    pub const fn gifti_name(self) -> &'static str {
        match self {
            Self::Left => "CortexLeft",
            Self::Right => "CortexRight",
        }
    }

    pub fn from_gifti_name(name: &str) -> Option<Self> {
        match name {
            "CortexLeft" => Some(Self::Left),
            "CortexRight" => Some(Self::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gifti_name())
    }
}
