//! GIFTI functional surface series (`*.func.gii`).
//!
//! Each one-dimensional `DataArray` is one frame. A two-dimensional array
//! (vertices x frames) contributes one frame per column. Geometry arrays
//! (pointsets, triangles) are skipped.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace};

use super::Hemisphere;
use crate::core::xml::{attr_value, parse_attr, required_attr, tag_name, XmlWriter};
use crate::core::{gunzip, is_gzip, zlib_compress, zlib_decompress, MetaData};
use crate::util::{Error, Result};

/// Global metadata key naming the hemisphere.
pub const ANATOMICAL_STRUCTURE_PRIMARY: &str = "AnatomicalStructurePrimary";

const GIFTI_DOCTYPE: &str = r#"GIFTI SYSTEM "http://www.nitrc.org/frs/download.php/115/gifti.dtd""#;
const INTENT_TIME_SERIES: &str = "NIFTI_INTENT_TIME_SERIES";
const GEOMETRY_INTENTS: [&str; 2] = ["NIFTI_INTENT_POINTSET", "NIFTI_INTENT_TRIANGLE"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArrayType {
    Float32,
    Float64,
    Int32,
    UInt8,
}

impl ArrayType {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "NIFTI_TYPE_FLOAT32" => Ok(Self::Float32),
            "NIFTI_TYPE_FLOAT64" => Ok(Self::Float64),
            "NIFTI_TYPE_INT32" => Ok(Self::Int32),
            "NIFTI_TYPE_UINT8" => Ok(Self::UInt8),
            other => Err(Error::UnsupportedDataType(other.to_string())),
        }
    }

    fn byte_size(self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::Float32 | Self::Int32 => 4,
            Self::Float64 => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Ascii,
    Base64,
    GzipBase64,
}

impl Encoding {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "ASCII" => Ok(Self::Ascii),
            "Base64Binary" => Ok(Self::Base64),
            "GZipBase64Binary" => Ok(Self::GzipBase64),
            "ExternalFileBinary" => Err(Error::invalid("external GIFTI data files are not supported")),
            other => Err(Error::invalid(format!("unknown GIFTI encoding {}", other))),
        }
    }
}

/// Attributes of one `DataArray`.
#[derive(Clone, Debug)]
struct ArrayDesc {
    intent: String,
    datatype: ArrayType,
    encoding: Encoding,
    big_endian: bool,
    column_major: bool,
    dims: Vec<usize>,
}

impl ArrayDesc {
    fn from_element(e: &BytesStart<'_>) -> Result<Self> {
        let rank: usize = parse_attr(e, "Dimensionality")?;
        let dims = (0..rank)
            .map(|i| parse_attr::<usize>(e, &format!("Dim{}", i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            intent: attr_value(e, "Intent")?.unwrap_or_default(),
            datatype: ArrayType::parse(&required_attr(e, "DataType")?)?,
            encoding: Encoding::parse(&required_attr(e, "Encoding")?)?,
            big_endian: attr_value(e, "Endian")?.is_some_and(|v| v == "BigEndian"),
            column_major: attr_value(e, "ArrayIndexingOrder")?.is_some_and(|v| v == "ColumnMajorOrder"),
            dims,
        })
    }

    fn is_geometry(&self) -> bool {
        GEOMETRY_INTENTS.contains(&self.intent.as_str())
    }

    fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    fn decode(&self, text: &str) -> Result<Vec<f32>> {
        let values = match self.encoding {
            Encoding::Ascii => text
                .split_ascii_whitespace()
                .map(|tok| {
                    tok.parse::<f32>()
                        .map_err(|_| Error::invalid(format!("bad ASCII GIFTI value '{}'", tok)))
                })
                .collect::<Result<Vec<_>>>()?,
            Encoding::Base64 | Encoding::GzipBase64 => {
                let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                let mut raw = STANDARD.decode(compact.as_bytes())?;
                if self.encoding == Encoding::GzipBase64 {
                    let hint = self.num_elements() * self.datatype.byte_size();
                    raw = if is_gzip(&raw) { gunzip(&raw)? } else { zlib_decompress(&raw, hint)? };
                }
                if self.big_endian {
                    decode_binary::<BigEndian>(self.datatype, &raw)
                } else {
                    decode_binary::<LittleEndian>(self.datatype, &raw)
                }
            }
        };
        if values.len() != self.num_elements() {
            return Err(Error::invalid(format!(
                "DataArray declares {:?} but holds {} values",
                self.dims,
                values.len()
            )));
        }
        Ok(values)
    }

    /// Split decoded values into frames of one value per vertex.
    fn into_frames(&self, values: Vec<f32>) -> Result<Vec<Vec<f32>>> {
        match self.dims.as_slice() {
            [_] => Ok(vec![values]),
            [n, 1] => Ok(vec![values[..*n].to_vec()]),
            &[n, t] => Ok((0..t)
                .map(|col| {
                    (0..n)
                        .map(|v| if self.column_major { values[col * n + v] } else { values[v * t + col] })
                        .collect()
                })
                .collect()),
            dims => Err(Error::invalid(format!("unsupported DataArray shape {:?}", dims))),
        }
    }
}

fn decode_binary<E: ByteOrder>(dt: ArrayType, raw: &[u8]) -> Vec<f32> {
    match dt {
        ArrayType::UInt8 => raw.iter().map(|&v| v as f32).collect(),
        ArrayType::Int32 => raw.chunks_exact(4).map(|c| E::read_i32(c) as f32).collect(),
        ArrayType::Float32 => raw.chunks_exact(4).map(E::read_f32).collect(),
        ArrayType::Float64 => raw.chunks_exact(8).map(|c| E::read_f64(c) as f32).collect(),
    }
}

/// Per-vertex time series on one hemisphere's surface.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SurfaceSeries {
    meta: MetaData,
    frames: Vec<Vec<f32>>,
}

impl SurfaceSeries {
    /// Build from frames; every frame must cover the same vertices.
    pub fn new(frames: Vec<Vec<f32>>) -> Result<Self> {
        if let Some(first) = frames.first() {
            if let Some(bad) = frames.iter().position(|f| f.len() != first.len()) {
                return Err(Error::invalid(format!(
                    "frame {} has {} vertices, frame 0 has {}",
                    bad,
                    frames[bad].len(),
                    first.len()
                )));
            }
        }
        Ok(Self { meta: MetaData::new(), frames })
    }

    /// Tag the series with its hemisphere.
    pub fn with_hemisphere(mut self, hemisphere: Hemisphere) -> Self {
        self.meta.set(ANATOMICAL_STRUCTURE_PRIMARY, hemisphere.gifti_name());
        self
    }

    /// Read a `.func.gii` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let series = Self::parse(&bytes)?;
        debug!(
            path = %path.display(),
            vertices = series.num_vertices(),
            frames = series.num_frames(),
            hemisphere = ?series.hemisphere(),
            "read GIFTI series"
        );
        Ok(series)
    }

    /// Parse GIFTI XML.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut meta = MetaData::new();
        let mut frames: Vec<Vec<f32>> = Vec::new();
        let mut seen_root = false;

        // Parser state
        let mut array: Option<ArrayDesc> = None;
        let mut in_data = false;
        let mut data_text = String::new();
        let mut md_field: Option<&'static str> = None;
        let mut md_name = String::new();
        let mut md_value = String::new();

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"GIFTI" => seen_root = true,
                    b"DataArray" => array = Some(ArrayDesc::from_element(&e)?),
                    b"Data" => {
                        in_data = true;
                        data_text.clear();
                    }
                    b"MD" => {
                        md_name.clear();
                        md_value.clear();
                    }
                    b"Name" => md_field = Some("name"),
                    b"Value" => md_field = Some("value"),
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"GIFTI" => seen_root = true,
                    b"DataArray" => {
                        return Err(Error::invalid(format!("<{}> without data", tag_name(&e))));
                    }
                    _ => {}
                },
                Event::Text(e) => {
                    let text = e.unescape()?;
                    if in_data {
                        data_text.push_str(&text);
                    } else {
                        push_md_text(md_field, &text, &mut md_name, &mut md_value);
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e);
                    if in_data {
                        data_text.push_str(&text);
                    } else {
                        push_md_text(md_field, &text, &mut md_name, &mut md_value);
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"Data" => in_data = false,
                    b"Name" | b"Value" => md_field = None,
                    // Only file-level metadata is kept.
                    b"MD" if array.is_none() => meta.set(md_name.trim(), md_value.trim()),
                    b"DataArray" => {
                        if let Some(desc) = array.take() {
                            if desc.is_geometry() {
                                trace!(intent = %desc.intent, "skipping geometry array");
                            } else {
                                let values = desc.decode(&data_text)?;
                                frames.extend(desc.into_frames(values)?);
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(Error::invalid("not a GIFTI document"));
        }
        let mut series = Self::new(frames)?;
        series.meta = meta;
        Ok(series)
    }

    /// Number of vertices (0 without frames).
    pub fn num_vertices(&self) -> usize {
        self.frames.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    /// Value at `vertex` in frame `t`.
    #[inline]
    pub fn value(&self, vertex: usize, t: usize) -> f32 {
        self.frames[t][vertex]
    }

    #[inline]
    pub fn meta(&self) -> &MetaData {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut MetaData {
        &mut self.meta
    }

    /// Hemisphere declared by `AnatomicalStructurePrimary`, if any.
    pub fn hemisphere(&self) -> Option<Hemisphere> {
        self.meta
            .get(ANATOMICAL_STRUCTURE_PRIMARY)
            .and_then(Hemisphere::from_gifti_name)
    }

    /// Serialize with one gzip-base64 FLOAT32 array per frame.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = XmlWriter::new();
        w.declaration()?;
        w.doctype(GIFTI_DOCTYPE)?;
        let count = self.frames.len().to_string();
        w.start("GIFTI", &[("Version", "1.0"), ("NumberOfDataArrays", count.as_str())])?;
        write_meta(&mut w, &self.meta)?;
        w.empty("LabelTable", &[])?;

        let dim0 = self.num_vertices().to_string();
        for frame in &self.frames {
            w.start(
                "DataArray",
                &[
                    ("Intent", INTENT_TIME_SERIES),
                    ("DataType", "NIFTI_TYPE_FLOAT32"),
                    ("ArrayIndexingOrder", "RowMajorOrder"),
                    ("Dimensionality", "1"),
                    ("Dim0", dim0.as_str()),
                    ("Encoding", "GZipBase64Binary"),
                    ("Endian", "LittleEndian"),
                    ("ExternalFileName", ""),
                    ("ExternalFileOffset", ""),
                ],
            )?;
            w.empty("MetaData", &[])?;
            let mut raw = vec![0u8; frame.len() * 4];
            LittleEndian::write_f32_into(frame, &mut raw);
            let encoded = STANDARD.encode(zlib_compress(&raw, 6)?);
            w.text_element("Data", &[], &encoded)?;
            w.end("DataArray")?;
        }
        w.end("GIFTI")?;
        Ok(w.finish())
    }

    /// Write a `.func.gii` file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|e| Error::write(path, e))
    }
}

fn push_md_text(field: Option<&str>, text: &str, name: &mut String, value: &mut String) {
    match field {
        Some("name") => name.push_str(text),
        Some("value") => value.push_str(text),
        _ => {}
    }
}

fn write_meta(w: &mut XmlWriter, meta: &MetaData) -> Result<()> {
    if meta.is_empty() {
        return w.empty("MetaData", &[]);
    }
    w.start("MetaData", &[])?;
    for (key, value) in meta.iter() {
        w.start("MD", &[])?;
        w.cdata_element("Name", key)?;
        w.cdata_element("Value", value)?;
        w.end("MD")?;
    }
    w.end("MetaData")
}
