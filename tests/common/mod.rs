//! Fixture tree shared by the integration tests: a FreeSurfer subjects
//! directory, a template directory with the label atlas, a BOLD volume and
//! two GIFTI series, all inside one temporary directory.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use cifti::nifti::{write_f32_volume, write_label_volume, NiftiVersion};
use cifti::pipeline::{GenerateConfig, ATLAS_DATASET, ATLAS_FILE};
use cifti::surface::{Annotation, ColorTableEntry, Hemisphere, SurfaceSeries};
use cifti::util::affine_from_rows;
use glam::DMat4;
use tempfile::TempDir;

pub const FRAMES: usize = 4;
pub const TR: f64 = 2.0;
pub const SHAPE: [usize; 3] = [6, 5, 4];

pub const LH_VERTICES: usize = 100;
pub const RH_VERTICES: usize = 80;
pub const LH_UNKNOWN: [usize; 5] = [0, 17, 33, 50, 99];
pub const RH_UNKNOWN: [usize; 3] = [5, 6, 7];

pub const SURFACE_TARGET: &str = "fsaverage5";
pub const VOLUME_TARGET: &str = "MNI152NLin2009cAsym";
pub const BOLD_NAME: &str = "sub-01_task-rest_space-MNI152NLin2009cAsym_bold.nii.gz";
pub const BOLD_BASE: &str = "sub-01_task-rest_space-MNI152NLin2009cAsym_bold";

pub fn affine() -> DMat4 {
    affine_from_rows([
        [-2.0, 0.0, 0.0, 90.0],
        [0.0, 2.0, 0.0, -126.0],
        [0.0, 0.0, 2.0, -72.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// BOLD value at voxel (i, j, k), frame t.
pub fn bold_value(i: usize, j: usize, k: usize, t: usize) -> f32 {
    (i * 100 + j * 10 + k) as f32 + t as f32 * 1000.0
}

/// Surface value at vertex v, frame t.
pub fn surface_value(hemisphere: Hemisphere, v: usize, t: usize) -> f32 {
    let base = match hemisphere {
        Hemisphere::Left => 0.0,
        Hemisphere::Right => 10_000.0,
    };
    base + v as f32 + t as f32 * 0.5
}

/// Atlas code at voxel (i, j, k).
///
/// - 17 (left hippocampus): k == 0, i < 4, j < 3 (12 voxels)
/// - 10 (left thalamus): k == 1, i < 2, j < 2 (4 voxels)
/// - 16 (brain stem): k == 3, i == 5 (5 voxels)
/// - 49 (right thalamus): (0, 4, 2)
pub fn atlas_label(i: usize, j: usize, k: usize) -> i32 {
    match (i, j, k) {
        (i, j, 0) if i < 4 && j < 3 => 17,
        (i, j, 1) if i < 2 && j < 2 => 10,
        (5, _, 3) => 16,
        (0, 4, 2) => 49,
        _ => 0,
    }
}

pub fn aparc_entries() -> Vec<ColorTableEntry> {
    vec![
        ColorTableEntry::new(0, "unknown", [25, 5, 25, 0]),
        ColorTableEntry::new(1, "bankssts", [25, 100, 40, 0]),
        ColorTableEntry::new(2, "precentral", [60, 20, 220, 0]),
    ]
}

pub fn write_annotation(path: &Path, vertices: usize, unknown: &[usize]) {
    let labels = (0..vertices)
        .map(|v| if unknown.contains(&v) { 0 } else { 1 + (v % 2) as i32 })
        .collect();
    Annotation::new(labels, aparc_entries())
        .expect("annotation")
        .write(path)
        .expect("write annotation");
}

pub fn surface_series(hemisphere: Hemisphere, vertices: usize, frames: usize) -> SurfaceSeries {
    let frames = (0..frames)
        .map(|t| (0..vertices).map(|v| surface_value(hemisphere, v, t)).collect())
        .collect();
    SurfaceSeries::new(frames).expect("surface series").with_hemisphere(hemisphere)
}

pub fn write_bold(path: &Path, shape: [usize; 3], frames: usize) {
    let [nx, ny, nz] = shape;
    let mut data = Vec::with_capacity(nx * ny * nz * frames);
    for t in 0..frames {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(bold_value(i, j, k, t));
                }
            }
        }
    }
    write_f32_volume(path, NiftiVersion::Nifti1, &[nx, ny, nz, frames], &affine(), &data).expect("write bold");
}

pub fn write_atlas(path: &Path, shape: [usize; 3]) {
    let [nx, ny, nz] = shape;
    let mut labels = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                labels.push(atlas_label(i, j, k));
            }
        }
    }
    write_label_volume(path, shape, &affine(), &labels).expect("write atlas");
}

pub struct Fixture {
    pub root: TempDir,
    pub config: GenerateConfig,
}

impl Fixture {
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    pub fn annotation_dir(&self) -> PathBuf {
        self.config.subjects_dir.join(SURFACE_TARGET).join("label")
    }

    pub fn atlas_path(&self) -> PathBuf {
        self.config.templates_dir.join(ATLAS_DATASET).join(ATLAS_FILE)
    }
}

/// Complete, valid input tree.
pub fn build() -> Fixture {
    let root = tempfile::tempdir().expect("tempdir");
    let base = root.path();

    let subjects_dir = base.join("subjects");
    let label_dir = subjects_dir.join(SURFACE_TARGET).join("label");
    fs::create_dir_all(&label_dir).expect("label dir");
    write_annotation(&label_dir.join("lh.aparc.annot"), LH_VERTICES, &LH_UNKNOWN);
    write_annotation(&label_dir.join("rh.aparc.annot"), RH_VERTICES, &RH_UNKNOWN);

    let templates_dir = base.join("templates");
    let dataset = templates_dir.join(ATLAS_DATASET);
    fs::create_dir_all(&dataset).expect("dataset dir");
    write_atlas(&dataset.join(ATLAS_FILE), SHAPE);

    let func_dir = base.join("func");
    fs::create_dir_all(&func_dir).expect("func dir");
    let bold_file = func_dir.join(BOLD_NAME);
    write_bold(&bold_file, SHAPE, FRAMES);

    let lh = func_dir.join("sub-01_hemi-L_space-fsaverage5_bold.func.gii");
    let rh = func_dir.join("sub-01_hemi-R_space-fsaverage5_bold.func.gii");
    surface_series(Hemisphere::Left, LH_VERTICES, FRAMES).write(&lh).expect("write lh");
    surface_series(Hemisphere::Right, RH_VERTICES, FRAMES).write(&rh).expect("write rh");

    let config = GenerateConfig {
        bold_file,
        gifti_files: vec![lh, rh],
        repetition_time: TR,
        volume_target: VOLUME_TARGET.to_string(),
        surface_target: SURFACE_TARGET.to_string(),
        subjects_dir,
        templates_dir,
        label_file: None,
        atlas_url: None,
        out_dir: base.join("out"),
        use_mmap: true,
    };
    Fixture { root, config }
}
