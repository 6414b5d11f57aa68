//! Math type re-exports and affine helpers for voxel-to-world transforms.
//!
//! Affines are stored as `glam::DMat4` (column-major). NIfTI and CIFTI
//! serialize them row by row, so conversion helpers work on row arrays.

pub use glam::{DMat3, DMat4, DQuat, DVec3, DVec4};

/// Build an affine from four rows (row-major, as stored on disk).
#[inline]
pub fn affine_from_rows(rows: [[f64; 4]; 4]) -> DMat4 {
    DMat4::from_cols_array_2d(&rows).transpose()
}

/// Split an affine back into rows.
#[inline]
pub fn affine_rows(m: &DMat4) -> [[f64; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

/// Affine with voxel sizes on the diagonal and no rotation or offset.
pub fn scaling_affine(voxel_size: [f64; 3]) -> DMat4 {
    DMat4::from_scale(DVec3::from_array(voxel_size))
}

/// Affine described by a NIfTI quaternion (`qform`).
///
/// `quatern` holds (b, c, d); `a` is recovered from the unit norm and
/// clamped at zero when rounding pushes the sum past one. `qfac` flips
/// the third axis when negative.
pub fn quaternion_affine(
    quatern: [f64; 3],
    qoffset: [f64; 3],
    voxel_size: [f64; 3],
    qfac: f64,
) -> DMat4 {
    let [b, c, d] = quatern;
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let rot = DMat3::from_quat(DQuat::from_xyzw(b, c, d, a).normalize());

    let qfac = if qfac < 0.0 { -1.0 } else { 1.0 };
    let x = rot.x_axis * voxel_size[0];
    let y = rot.y_axis * voxel_size[1];
    let z = rot.z_axis * (voxel_size[2] * qfac);

    DMat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        z.extend(0.0),
        DVec3::from_array(qoffset).extend(1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_roundtrip() {
        let rows = [
            [-2.0, 0.0, 0.0, 90.0],
            [0.0, 2.0, 0.0, -126.0],
            [0.0, 0.0, 2.0, -72.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m = affine_from_rows(rows);
        // column 3 holds the translation
        assert_eq!(m.w_axis.x, 90.0);
        assert_eq!(m.x_axis.x, -2.0);
        assert_eq!(affine_rows(&m), rows);
    }

    #[test]
    fn test_identity_quaternion() {
        let m = quaternion_affine([0.0; 3], [1.0, 2.0, 3.0], [2.0, 3.0, 4.0], 1.0);
        let rows = affine_rows(&m);
        assert_eq!(rows[0], [2.0, 0.0, 0.0, 1.0]);
        assert_eq!(rows[1], [0.0, 3.0, 0.0, 2.0]);
        assert_eq!(rows[2], [0.0, 0.0, 4.0, 3.0]);
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_qfac_flips_k() {
        let m = quaternion_affine([0.0; 3], [0.0; 3], [1.0, 1.0, 1.0], -1.0);
        assert_eq!(affine_rows(&m)[2][2], -1.0);
    }

    #[test]
    fn test_half_turn_about_z() {
        // b=c=0, d=1 -> 180 degrees about z
        let m = quaternion_affine([0.0, 0.0, 1.0], [0.0; 3], [1.0, 1.0, 1.0], 1.0);
        let rows = affine_rows(&m);
        assert!((rows[0][0] + 1.0).abs() < 1e-12);
        assert!((rows[1][1] + 1.0).abs() < 1e-12);
        assert!((rows[2][2] - 1.0).abs() < 1e-12);
    }
}
