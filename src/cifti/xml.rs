//! CIFTI-2 XML header for dense time series.
//!
//! ```text
//! <CIFTI Version="2">
//!   <Matrix>
//!     <MetaData>...</MetaData>
//!     <MatrixIndicesMap AppliesToMatrixDimension="0" ...SERIES...>
//!     <MatrixIndicesMap AppliesToMatrixDimension="1" ...BRAIN_MODELS...>
//!       <BrainModel ...><VertexIndices>|<VoxelIndicesIJK></BrainModel>
//!       <Volume><TransformationMatrixVoxelIndicesIJKtoXYZ/></Volume>
//!     </MatrixIndicesMap>
//!   </Matrix>
//! </CIFTI>
//! ```
//!
//! Output is deterministic: attribute order is fixed and numbers use the
//! shortest representation that reads back to the same value.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::model::{BrainModelEntry, CiftiHeader, ModelIndices, ModelType, VolumeGeometry};
use crate::core::xml::{attr_value, parse_attr, required_attr, XmlWriter};
use crate::core::{MetaData, SeriesMap, SeriesUnit};
use crate::util::{affine_from_rows, affine_rows, Error, Result};

pub const CIFTI_VERSION: &str = "2";
const INDEX_TYPE_SERIES: &str = "CIFTI_INDEX_TYPE_SERIES";
const INDEX_TYPE_BRAIN_MODELS: &str = "CIFTI_INDEX_TYPE_BRAIN_MODELS";

/// Serialize a header.
pub fn write_cifti_xml(header: &CiftiHeader) -> Result<Vec<u8>> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("CIFTI", &[("Version", CIFTI_VERSION)])?;
    w.start("Matrix", &[])?;

    if header.metadata.is_empty() {
        w.empty("MetaData", &[])?;
    } else {
        w.start("MetaData", &[])?;
        for (key, value) in header.metadata.iter() {
            w.start("MD", &[])?;
            w.text_element("Name", &[], key)?;
            w.text_element("Value", &[], value)?;
            w.end("MD")?;
        }
        w.end("MetaData")?;
    }

    let series = &header.series;
    let num_points = series.num_points.to_string();
    let exponent = series.exponent.to_string();
    let start = series.start.to_string();
    let step = series.step.to_string();
    w.empty(
        "MatrixIndicesMap",
        &[
            ("AppliesToMatrixDimension", "0"),
            ("IndicesMapToDataType", INDEX_TYPE_SERIES),
            ("NumberOfSeriesPoints", num_points.as_str()),
            ("SeriesExponent", exponent.as_str()),
            ("SeriesStart", start.as_str()),
            ("SeriesStep", step.as_str()),
            ("SeriesUnit", series.unit.as_str()),
        ],
    )?;

    w.start(
        "MatrixIndicesMap",
        &[("AppliesToMatrixDimension", "1"), ("IndicesMapToDataType", INDEX_TYPE_BRAIN_MODELS)],
    )?;
    for model in &header.brain_models {
        write_brain_model(&mut w, model)?;
    }
    if let Some(volume) = &header.volume {
        let dims = format!("{},{},{}", volume.dims[0], volume.dims[1], volume.dims[2]);
        w.start("Volume", &[("VolumeDimensions", dims.as_str())])?;
        let matrix = affine_rows(&volume.affine)
            .iter()
            .map(|row| join(row.iter()))
            .collect::<Vec<_>>()
            .join("\n");
        let meter_exponent = volume.meter_exponent.to_string();
        w.text_element(
            "TransformationMatrixVoxelIndicesIJKtoXYZ",
            &[("MeterExponent", meter_exponent.as_str())],
            &matrix,
        )?;
        w.end("Volume")?;
    }
    w.end("MatrixIndicesMap")?;

    w.end("Matrix")?;
    w.end("CIFTI")?;
    Ok(w.finish())
}

fn write_brain_model(w: &mut XmlWriter, model: &BrainModelEntry) -> Result<()> {
    let offset = model.index_offset.to_string();
    let count = model.index_count.to_string();
    let mut attrs = vec![
        ("IndexOffset", offset.as_str()),
        ("IndexCount", count.as_str()),
        ("ModelType", model.model_type().as_str()),
        ("BrainStructure", model.structure.as_str()),
    ];
    match &model.indices {
        ModelIndices::Surface { vertex_indices, total_vertices } => {
            let total = total_vertices.to_string();
            attrs.push(("SurfaceNumberOfVertices", total.as_str()));
            w.start("BrainModel", &attrs)?;
            w.text_element("VertexIndices", &[], &join(vertex_indices.iter()))?;
        }
        ModelIndices::Volume { voxels } => {
            w.start("BrainModel", &attrs)?;
            let ijk = voxels
                .iter()
                .map(|v| join(v.iter()))
                .collect::<Vec<_>>()
                .join("\n");
            w.text_element("VoxelIndicesIJK", &[], &ijk)?;
        }
    }
    w.end("BrainModel")
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

/// Attributes of a `BrainModel` awaiting its index list.
struct PendingModel {
    structure: String,
    offset: usize,
    count: usize,
    model_type: ModelType,
    total_vertices: Option<usize>,
    text: String,
}

impl PendingModel {
    fn from_element(e: &BytesStart<'_>) -> Result<Self> {
        Ok(Self {
            structure: required_attr(e, "BrainStructure")?,
            offset: parse_attr(e, "IndexOffset")?,
            count: parse_attr(e, "IndexCount")?,
            model_type: required_attr(e, "ModelType")?.parse()?,
            total_vertices: attr_value(e, "SurfaceNumberOfVertices")?
                .map(|v| {
                    v.trim()
                        .parse()
                        .map_err(|_| Error::invalid(format!("bad SurfaceNumberOfVertices '{}'", v)))
                })
                .transpose()?,
            text: String::new(),
        })
    }

    fn finish(self) -> Result<BrainModelEntry> {
        let numbers = parse_numbers::<usize>(&self.text)?;
        let indices = match self.model_type {
            ModelType::Surface => ModelIndices::Surface {
                vertex_indices: numbers,
                total_vertices: self.total_vertices.ok_or_else(|| {
                    Error::invalid(format!("{} lacks SurfaceNumberOfVertices", self.structure))
                })?,
            },
            ModelType::Voxels => {
                if numbers.len() % 3 != 0 {
                    return Err(Error::invalid(format!(
                        "{} has {} voxel index values, not a multiple of 3",
                        self.structure,
                        numbers.len()
                    )));
                }
                ModelIndices::Volume {
                    voxels: numbers.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
                }
            }
        };
        Ok(BrainModelEntry {
            structure: self.structure,
            index_offset: self.offset,
            index_count: self.count,
            indices,
        })
    }
}

fn parse_numbers<T: std::str::FromStr>(text: &str) -> Result<Vec<T>> {
    text.split(|c: char| c.is_ascii_whitespace() || c == ',')
        .filter(|tok| !tok.is_empty())
        .map(|tok| tok.parse().map_err(|_| Error::invalid(format!("bad number '{}'", tok))))
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    MdName,
    MdValue,
    Indices,
    Transform,
}

/// Accumulated state while walking the document.
struct HeaderParser {
    version: Option<String>,
    metadata: MetaData,
    series: Option<SeriesMap>,
    saw_brain_models: bool,
    brain_models: Vec<BrainModelEntry>,
    volume: Option<VolumeGeometry>,

    target: TextTarget,
    md: (String, String),
    pending: Option<PendingModel>,
    volume_dims: Option<[usize; 3]>,
    meter_exponent: i32,
    transform: String,
}

impl HeaderParser {
    fn new() -> Self {
        Self {
            version: None,
            metadata: MetaData::new(),
            series: None,
            saw_brain_models: false,
            brain_models: Vec::new(),
            volume: None,
            target: TextTarget::None,
            md: (String::new(), String::new()),
            pending: None,
            volume_dims: None,
            meter_exponent: VolumeGeometry::MILLIMETERS,
            transform: String::new(),
        }
    }

    fn start(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<()> {
        match e.local_name().as_ref() {
            b"CIFTI" => self.version = Some(required_attr(e, "Version")?),
            b"MD" => self.md = (String::new(), String::new()),
            b"Name" => self.target = TextTarget::MdName,
            b"Value" => self.target = TextTarget::MdValue,
            b"MatrixIndicesMap" => match required_attr(e, "IndicesMapToDataType")?.as_str() {
                INDEX_TYPE_SERIES => self.series = Some(parse_series(e)?),
                INDEX_TYPE_BRAIN_MODELS => self.saw_brain_models = true,
                other => {
                    return Err(Error::invalid(format!(
                        "unsupported index map {} in dense series",
                        other
                    )))
                }
            },
            b"BrainModel" => {
                let model = PendingModel::from_element(e)?;
                if is_empty {
                    self.brain_models.push(model.finish()?);
                } else {
                    self.pending = Some(model);
                }
            }
            b"VertexIndices" | b"VoxelIndicesIJK" => self.target = TextTarget::Indices,
            b"Volume" => {
                let dims = parse_numbers::<usize>(&required_attr(e, "VolumeDimensions")?)?;
                let &[x, y, z] = dims.as_slice() else {
                    return Err(Error::invalid(format!("VolumeDimensions {:?} is not 3D", dims)));
                };
                self.volume_dims = Some([x, y, z]);
            }
            b"TransformationMatrixVoxelIndicesIJKtoXYZ" => {
                self.meter_exponent = parse_attr(e, "MeterExponent")?;
                self.transform.clear();
                self.target = TextTarget::Transform;
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        match self.target {
            TextTarget::MdName => self.md.0.push_str(text),
            TextTarget::MdValue => self.md.1.push_str(text),
            TextTarget::Indices => {
                if let Some(model) = self.pending.as_mut() {
                    model.text.push(' ');
                    model.text.push_str(text);
                }
            }
            TextTarget::Transform => {
                self.transform.push(' ');
                self.transform.push_str(text);
            }
            TextTarget::None => {}
        }
    }

    fn end(&mut self, name: &[u8]) -> Result<()> {
        match name {
            b"Name" | b"Value" | b"VertexIndices" | b"VoxelIndicesIJK" => self.target = TextTarget::None,
            b"TransformationMatrixVoxelIndicesIJKtoXYZ" => self.target = TextTarget::None,
            b"MD" => self.metadata.set(self.md.0.trim(), self.md.1.trim()),
            b"BrainModel" => {
                if let Some(model) = self.pending.take() {
                    self.brain_models.push(model.finish()?);
                }
            }
            b"Volume" => {
                let dims = self
                    .volume_dims
                    .take()
                    .ok_or_else(|| Error::invalid("Volume without dimensions"))?;
                let rows = matrix_rows(&parse_numbers::<f64>(&self.transform)?)?;
                self.volume = Some(VolumeGeometry {
                    dims,
                    affine: affine_from_rows(rows),
                    meter_exponent: self.meter_exponent,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<CiftiHeader> {
        match self.version.as_deref() {
            Some(CIFTI_VERSION) => {}
            Some(other) => return Err(Error::invalid(format!("unsupported CIFTI version {}", other))),
            None => return Err(Error::invalid("missing <CIFTI> root")),
        }
        let series = self.series.ok_or_else(|| Error::invalid("missing series map"))?;
        if !self.saw_brain_models {
            return Err(Error::invalid("missing brain-model map"));
        }
        let header = CiftiHeader {
            series,
            brain_models: self.brain_models,
            volume: self.volume,
            metadata: self.metadata,
        };
        header.validate()?;
        Ok(header)
    }
}

/// Parse a header. The result is validated before it is returned.
pub fn parse_cifti_xml(bytes: &[u8]) -> Result<CiftiHeader> {
    // Extension payloads are NUL padded.
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    let mut reader = Reader::from_reader(&bytes[..end]);
    reader.trim_text(true);

    let mut parser = HeaderParser::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => parser.start(&e, false)?,
            Event::Empty(e) => parser.start(&e, true)?,
            Event::Text(t) => parser.text(&t.unescape()?),
            Event::CData(t) => parser.text(&String::from_utf8_lossy(&t)),
            Event::End(e) => parser.end(e.local_name().as_ref())?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    parser.finish()
}

fn parse_series(e: &BytesStart<'_>) -> Result<SeriesMap> {
    Ok(SeriesMap {
        num_points: parse_attr(e, "NumberOfSeriesPoints")?,
        exponent: parse_attr(e, "SeriesExponent")?,
        start: parse_attr(e, "SeriesStart")?,
        step: parse_attr(e, "SeriesStep")?,
        unit: required_attr(e, "SeriesUnit")?.parse::<SeriesUnit>()?,
    })
}

fn matrix_rows(values: &[f64]) -> Result<[[f64; 4]; 4]> {
    if values.len() != 16 {
        return Err(Error::invalid(format!(
            "transformation matrix needs 16 values, got {}",
            values.len()
        )));
    }
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        row.copy_from_slice(&values[r * 4..r * 4 + 4]);
    }
    Ok(rows)
}
