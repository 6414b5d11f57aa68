//! Ordered catalogue of the anatomical structures in a dense series.
//!
//! The order here is the column order of every file this crate writes:
//! both cortical surfaces first, then the sub-cortical volumes.

use std::fmt;

use crate::surface::Hemisphere;

/// How a structure contributes columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureKind {
    /// Cortical surface of one hemisphere; columns are vertices.
    Surface { hemisphere: Hemisphere },
    /// Sub-cortical region; columns are voxels carrying any of the codes.
    Volume { label_codes: &'static [i32] },
}

/// One registry row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StructureSpec {
    pub name: &'static str,
    pub kind: StructureKind,
}

impl StructureSpec {
    const fn surface(name: &'static str, hemisphere: Hemisphere) -> Self {
        Self { name, kind: StructureKind::Surface { hemisphere } }
    }

    const fn volume(name: &'static str, label_codes: &'static [i32]) -> Self {
        Self { name, kind: StructureKind::Volume { label_codes } }
    }

    #[inline]
    pub fn is_surface(&self) -> bool {
        matches!(self.kind, StructureKind::Surface { .. })
    }

    /// Hemisphere of a surface structure.
    pub fn hemisphere(&self) -> Option<Hemisphere> {
        match self.kind {
            StructureKind::Surface { hemisphere } => Some(hemisphere),
            StructureKind::Volume { .. } => None,
        }
    }

    /// Atlas codes of a volume structure; empty for surfaces.
    pub fn label_codes(&self) -> &'static [i32] {
        match self.kind {
            StructureKind::Surface { .. } => &[],
            StructureKind::Volume { label_codes } => label_codes,
        }
    }
}

impl fmt::Display for StructureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// FreeSurfer aseg codes; one per region.
pub static REGISTRY: [StructureSpec; 21] = [
    StructureSpec::surface("CIFTI_STRUCTURE_CORTEX_LEFT", Hemisphere::Left),
    StructureSpec::surface("CIFTI_STRUCTURE_CORTEX_RIGHT", Hemisphere::Right),
    StructureSpec::volume("CIFTI_STRUCTURE_ACCUMBENS_LEFT", &[26]),
    StructureSpec::volume("CIFTI_STRUCTURE_ACCUMBENS_RIGHT", &[58]),
    StructureSpec::volume("CIFTI_STRUCTURE_AMYGDALA_LEFT", &[18]),
    StructureSpec::volume("CIFTI_STRUCTURE_AMYGDALA_RIGHT", &[54]),
    StructureSpec::volume("CIFTI_STRUCTURE_BRAIN_STEM", &[16]),
    StructureSpec::volume("CIFTI_STRUCTURE_CAUDATE_LEFT", &[11]),
    StructureSpec::volume("CIFTI_STRUCTURE_CAUDATE_RIGHT", &[50]),
    StructureSpec::volume("CIFTI_STRUCTURE_CEREBELLUM_LEFT", &[6]),
    StructureSpec::volume("CIFTI_STRUCTURE_CEREBELLUM_RIGHT", &[45]),
    StructureSpec::volume("CIFTI_STRUCTURE_DIENCEPHALON_VENTRAL_LEFT", &[28]),
    StructureSpec::volume("CIFTI_STRUCTURE_DIENCEPHALON_VENTRAL_RIGHT", &[60]),
    StructureSpec::volume("CIFTI_STRUCTURE_HIPPOCAMPUS_LEFT", &[17]),
    StructureSpec::volume("CIFTI_STRUCTURE_HIPPOCAMPUS_RIGHT", &[53]),
    StructureSpec::volume("CIFTI_STRUCTURE_PALLIDUM_LEFT", &[13]),
    StructureSpec::volume("CIFTI_STRUCTURE_PALLIDUM_RIGHT", &[52]),
    StructureSpec::volume("CIFTI_STRUCTURE_PUTAMEN_LEFT", &[12]),
    StructureSpec::volume("CIFTI_STRUCTURE_PUTAMEN_RIGHT", &[51]),
    StructureSpec::volume("CIFTI_STRUCTURE_THALAMUS_LEFT", &[10]),
    StructureSpec::volume("CIFTI_STRUCTURE_THALAMUS_RIGHT", &[49]),
];

/// All structures in column order.
#[inline]
pub fn structures() -> &'static [StructureSpec] {
    &REGISTRY
}

/// Structure by name.
pub fn lookup(name: &str) -> Option<&'static StructureSpec> {
    REGISTRY.iter().find(|s| s.name == name)
}

/// Position of `name` in column order.
pub fn position(name: &str) -> Option<usize> {
    REGISTRY.iter().position(|s| s.name == name)
}

/// Surface structures, left then right.
pub fn surfaces() -> impl Iterator<Item = &'static StructureSpec> {
    REGISTRY.iter().filter(|s| s.is_surface())
}

/// Volume structures in column order.
pub fn volumes() -> impl Iterator<Item = &'static StructureSpec> {
    REGISTRY.iter().filter(|s| !s.is_surface())
}

/// Surface structure of a hemisphere.
pub fn surface_for(hemisphere: Hemisphere) -> Option<&'static StructureSpec> {
    surfaces().find(|s| s.hemisphere() == Some(hemisphere))
}
