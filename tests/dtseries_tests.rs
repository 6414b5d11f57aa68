//! On-disk layout of generated dense series and reader round trips.

mod common;

use std::fs;

use cifti::cifti::{read_dense_series, write_dense_series, xml::parse_cifti_xml};
use cifti::nifti::{NiftiImage, NiftiVersion, ECODE_CIFTI, INTENT_CONNECTIVITY_DENSE_SERIES, INTENT_NAME_DENSE_SERIES};
use cifti::pipeline::GenerateCifti;

use common::*;

#[test]
fn test_dtseries_nifti_header() {
    let fixture = build();
    let output = GenerateCifti::new(fixture.config.clone()).run().expect("Failed to generate");

    let image = NiftiImage::open(&output.path).expect("output should be valid NIfTI");
    let header = image.header();
    assert_eq!(header.version, NiftiVersion::Nifti2);
    assert_eq!(header.intent_code, INTENT_CONNECTIVITY_DENSE_SERIES);
    assert_eq!(header.intent_name, INTENT_NAME_DENSE_SERIES);
    assert_eq!(image.shape(), vec![1, 1, 1, 1, FRAMES, output.columns]);
    assert_eq!(header.vox_offset % 16, 0, "data starts on a 16-byte boundary");

    let ext = image.extension(ECODE_CIFTI).expect("CIFTI extension");
    let xml = String::from_utf8_lossy(&ext.data);
    assert!(xml.contains("<CIFTI Version=\"2\">"), "root element: {}", xml);
    assert!(xml.contains("ModelType=\"CIFTI_MODEL_TYPE_VOXELS\""));
    assert!(xml.contains("CIFTI_INDEX_TYPE_BRAIN_MODELS"));
    assert!(xml.contains("CIFTI_INDEX_TYPE_SERIES"));

    let parsed = parse_cifti_xml(&ext.data).expect("extension XML should parse");
    assert_eq!(parsed.num_columns(), output.columns);
}

#[test]
fn test_dtseries_column_major_payload() {
    let fixture = build();
    let output = GenerateCifti::new(fixture.config.clone()).run().expect("Failed to generate");
    let dense = read_dense_series(&output.path).expect("read");

    let image = NiftiImage::open(&output.path).expect("open");
    let raw = image.read_f32().expect("payload");
    assert_eq!(raw.len(), FRAMES * output.columns);

    // Frame index varies fastest on disk
    for c in [0, 1, output.columns / 2, output.columns - 1] {
        for t in 0..FRAMES {
            assert_eq!(raw[c * FRAMES + t], dense.matrix[[t, c]], "column {} frame {}", c, t);
        }
    }
}

#[test]
fn test_dtseries_rewrite_is_stable() {
    let fixture = build();
    let output = GenerateCifti::new(fixture.config.clone()).run().expect("Failed to generate");
    let original = fs::read(&output.path).expect("read bytes");

    let dense = read_dense_series(&output.path).expect("read");
    let copy = fixture.path("copy.dtseries.nii");
    write_dense_series(&dense, &copy).expect("rewrite");

    assert_eq!(fs::read(&copy).expect("read copy"), original);
    assert_eq!(read_dense_series(&copy).expect("read copy"), dense);
}

#[test]
fn test_dtseries_rejects_truncated_file() {
    let fixture = build();
    let output = GenerateCifti::new(fixture.config.clone()).run().expect("Failed to generate");

    let bytes = fs::read(&output.path).expect("read bytes");
    let truncated = fixture.path("truncated.dtseries.nii");
    fs::write(&truncated, &bytes[..bytes.len() - 8]).expect("write truncated");

    assert!(read_dense_series(&truncated).is_err(), "short payload must be rejected");
}
