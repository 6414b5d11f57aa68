//! FreeSurfer annotation (`?h.aparc.annot`) reader and writer.
//!
//! Big-endian layout:
//!
//! ```text
//! i32 vertex_count
//! vertex_count x (i32 vertex, i32 packed_rgb)
//! i32 has_color_table (1)
//! i32 n               n > 0: old table with n entries
//!                     n < 0: versioned table, version = -n (only 2 exists)
//! ```
//!
//! Classifications are positions into the colour table; vertices whose
//! packed colour matches no entry (or is 0) are classified `-1`.

use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::util::{Error, Result};

/// One colour-table row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorTableEntry {
    /// Structure id stored in versioned tables.
    pub index: i32,
    pub name: String,
    /// Red, green, blue, transparency.
    pub rgba: [i32; 4],
}

impl ColorTableEntry {
    pub fn new(index: i32, name: impl Into<String>, rgba: [i32; 4]) -> Self {
        Self { index, name: name.into(), rgba }
    }

    /// Packed colour stored per vertex: `r | g << 8 | b << 16`.
    #[inline]
    pub fn code(&self) -> i32 {
        self.rgba[0] | (self.rgba[1] << 8) | (self.rgba[2] << 16)
    }
}

/// Per-vertex classification plus the name table.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    labels: Vec<i32>,
    entries: Vec<ColorTableEntry>,
    orig_table: String,
}

impl Annotation {
    /// Reserved name of the medial-wall category.
    pub const MEDIAL_WALL_NAME: &'static str = "unknown";

    /// Build from classifications (positions into `entries`, or -1).
    pub fn new(labels: Vec<i32>, entries: Vec<ColorTableEntry>) -> Result<Self> {
        let n = entries.len() as i32;
        if let Some(bad) = labels.iter().find(|&&l| l < -1 || l >= n) {
            return Err(Error::invalid(format!(
                "classification {} outside colour table of {} entries",
                bad, n
            )));
        }
        Ok(Self { labels, entries, orig_table: String::new() })
    }

    /// Build from packed per-vertex colours, as stored on disk.
    pub fn from_packed(packed: &[i32], entries: Vec<ColorTableEntry>) -> Self {
        let labels = packed
            .iter()
            .map(|&raw| {
                if raw == 0 {
                    return -1;
                }
                entries
                    .iter()
                    .position(|e| e.code() == raw)
                    .map_or(-1, |p| p as i32)
            })
            .collect();
        Self { labels, entries, orig_table: String::new() }
    }

    /// Read an annotation file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let annot = Self::parse(&bytes)?;
        debug!(
            path = %path.display(),
            vertices = annot.num_vertices(),
            entries = annot.entries.len(),
            "read annotation"
        );
        Ok(annot)
    }

    /// Parse annotation bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);

        let vnum = read_count(&mut cur, "vertex count")?;
        if vnum * 8 > remaining(&cur) {
            return Err(Error::invalid(format!("annotation truncated: {} vertices declared", vnum)));
        }
        let mut packed = vec![0i32; vnum];
        for _ in 0..vnum {
            let vno = cur.read_i32::<BigEndian>()?;
            let value = cur.read_i32::<BigEndian>()?;
            let slot = usize::try_from(vno)
                .ok()
                .and_then(|v| packed.get_mut(v))
                .ok_or_else(|| Error::invalid(format!("vertex number {} out of range", vno)))?;
            *slot = value;
        }

        if remaining(&cur) < 4 || cur.read_i32::<BigEndian>()? == 0 {
            return Err(Error::invalid("annotation has no colour table"));
        }

        let n = cur.read_i32::<BigEndian>()?;
        let (entries, orig_table) = if n > 0 {
            read_old_table(&mut cur, n as usize)?
        } else {
            let version = -n;
            if version != 2 {
                return Err(Error::invalid(format!("unsupported colour table version {}", version)));
            }
            read_versioned_table(&mut cur)?
        };

        let mut annot = Self::from_packed(&packed, entries);
        annot.orig_table = orig_table;
        Ok(annot)
    }

    /// Number of vertices in the surface.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.labels.len()
    }

    /// Per-vertex classifications.
    #[inline]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    #[inline]
    pub fn entries(&self) -> &[ColorTableEntry] {
        &self.entries
    }

    /// Names in colour-table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Colour table file recorded by FreeSurfer.
    pub fn orig_table(&self) -> &str {
        &self.orig_table
    }

    /// Classification code of the entry named `name`.
    pub fn code_of(&self, name: &str) -> Option<i32> {
        self.entries.iter().position(|e| e.name == name).map(|p| p as i32)
    }

    /// Classification code of the medial wall.
    pub fn medial_wall_code(&self) -> Result<i32> {
        self.code_of(Self::MEDIAL_WALL_NAME).ok_or_else(|| {
            Error::lookup(format!(
                "annotation has no '{}' entry in its name table",
                Self::MEDIAL_WALL_NAME
            ))
        })
    }

    /// Serialize with a version-2 colour table.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.labels.len() * 8 + 64 * self.entries.len());
        // Writes to a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }

    /// Write an annotation file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()).map_err(|e| Error::write(path, e))
    }

    fn write_to(&self, w: &mut Vec<u8>) -> std::io::Result<()> {
        w.write_i32::<BigEndian>(self.labels.len() as i32)?;
        for (vno, &label) in self.labels.iter().enumerate() {
            let packed = usize::try_from(label)
                .ok()
                .and_then(|l| self.entries.get(l))
                .map_or(0, |e| e.code());
            w.write_i32::<BigEndian>(vno as i32)?;
            w.write_i32::<BigEndian>(packed)?;
        }

        w.write_i32::<BigEndian>(1)?;
        w.write_i32::<BigEndian>(-2)?;
        let max_index = self.entries.iter().map(|e| e.index + 1).max().unwrap_or(0);
        w.write_i32::<BigEndian>(max_index)?;
        write_string(w, &self.orig_table)?;
        w.write_i32::<BigEndian>(self.entries.len() as i32)?;
        for entry in &self.entries {
            w.write_i32::<BigEndian>(entry.index)?;
            write_string(w, &entry.name)?;
            for c in entry.rgba {
                w.write_i32::<BigEndian>(c)?;
            }
        }
        Ok(())
    }
}

fn remaining(cur: &Cursor<&[u8]>) -> usize {
    cur.get_ref().len().saturating_sub(cur.position() as usize)
}

fn read_count(cur: &mut Cursor<&[u8]>, what: &str) -> Result<usize> {
    let n = cur.read_i32::<BigEndian>()?;
    usize::try_from(n).map_err(|_| Error::invalid(format!("negative {}: {}", what, n)))
}

/// Length-prefixed string; trailing NULs dropped.
fn read_string(cur: &mut Cursor<&[u8]>) -> Result<String> {
    let len = read_count(cur, "string length")?;
    if len > remaining(cur) {
        return Err(Error::invalid(format!("string of {} bytes overruns file", len)));
    }
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn write_string(w: &mut Vec<u8>, s: &str) -> std::io::Result<()> {
    w.write_i32::<BigEndian>(s.len() as i32 + 1)?;
    w.extend_from_slice(s.as_bytes());
    w.push(0);
    Ok(())
}

fn read_rgba(cur: &mut Cursor<&[u8]>) -> Result<[i32; 4]> {
    let mut rgba = [0i32; 4];
    for c in &mut rgba {
        *c = cur.read_i32::<BigEndian>()?;
    }
    Ok(rgba)
}

fn read_old_table(cur: &mut Cursor<&[u8]>, n: usize) -> Result<(Vec<ColorTableEntry>, String)> {
    let orig = read_string(cur)?;
    let mut entries = Vec::with_capacity(n.min(4096));
    for i in 0..n {
        let name = read_string(cur)?;
        let rgba = read_rgba(cur)?;
        entries.push(ColorTableEntry::new(i as i32, name, rgba));
    }
    Ok((entries, orig))
}

fn read_versioned_table(cur: &mut Cursor<&[u8]>) -> Result<(Vec<ColorTableEntry>, String)> {
    let _max_index = cur.read_i32::<BigEndian>()?;
    let orig = read_string(cur)?;
    let n = read_count(cur, "colour table entry count")?;
    let mut entries = Vec::with_capacity(n.min(4096));
    for _ in 0..n {
        let index = cur.read_i32::<BigEndian>()?;
        let name = read_string(cur)?;
        let rgba = read_rgba(cur)?;
        entries.push(ColorTableEntry::new(index, name, rgba));
    }
    Ok((entries, orig))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aparc_entries() -> Vec<ColorTableEntry> {
        vec![
            ColorTableEntry::new(0, "unknown", [25, 5, 25, 0]),
            ColorTableEntry::new(1, "bankssts", [25, 100, 40, 0]),
            ColorTableEntry::new(2, "caudalanteriorcingulate", [125, 100, 160, 0]),
        ]
    }

    #[test]
    fn test_packed_code() {
        let e = ColorTableEntry::new(0, "unknown", [25, 5, 25, 0]);
        assert_eq!(e.code(), 25 + 5 * 256 + 25 * 65536);
    }

    #[test]
    fn test_from_packed_maps_to_positions() {
        let entries = aparc_entries();
        let packed = vec![entries[1].code(), 0, entries[0].code(), 12345, entries[2].code()];
        let annot = Annotation::from_packed(&packed, entries);
        assert_eq!(annot.labels(), &[1, -1, 0, -1, 2]);
    }

    #[test]
    fn test_roundtrip_versioned_table() {
        let annot = Annotation::new(vec![0, 1, 2, 2, -1, 0], aparc_entries()).unwrap();
        let parsed = Annotation::parse(&annot.to_bytes()).unwrap();
        assert_eq!(parsed.labels(), annot.labels());
        assert_eq!(parsed.names().collect::<Vec<_>>(), vec!["unknown", "bankssts", "caudalanteriorcingulate"]);
        assert_eq!(parsed.medial_wall_code().unwrap(), 0);
    }

    #[test]
    fn test_old_format_table() {
        let entries = aparc_entries();
        let mut buf = Vec::new();
        buf.write_i32::<BigEndian>(2).unwrap();
        buf.write_i32::<BigEndian>(0).unwrap();
        buf.write_i32::<BigEndian>(entries[2].code()).unwrap();
        buf.write_i32::<BigEndian>(1).unwrap();
        buf.write_i32::<BigEndian>(entries[0].code()).unwrap();
        buf.write_i32::<BigEndian>(1).unwrap();
        buf.write_i32::<BigEndian>(entries.len() as i32).unwrap();
        write_string(&mut buf, "colortable.txt").unwrap();
        for e in &entries {
            write_string(&mut buf, &e.name).unwrap();
            for c in e.rgba {
                buf.write_i32::<BigEndian>(c).unwrap();
            }
        }

        let annot = Annotation::parse(&buf).unwrap();
        assert_eq!(annot.labels(), &[2, 0]);
        assert_eq!(annot.orig_table(), "colortable.txt");
    }

    #[test]
    fn test_missing_unknown_is_lookup_error() {
        let entries = vec![ColorTableEntry::new(0, "bankssts", [25, 100, 40, 0])];
        let annot = Annotation::new(vec![0, 0], entries).unwrap();
        assert!(matches!(annot.medial_wall_code(), Err(Error::DataLookup(_))));
    }

    #[test]
    fn test_rejects_bad_files() {
        assert!(Annotation::parse(&[0, 0, 0]).is_err());

        let annot = Annotation::new(vec![0], aparc_entries()).unwrap();
        let mut bytes = annot.to_bytes();
        // version -2 -> -3
        let at = 4 + 8 + 4;
        bytes[at..at + 4].copy_from_slice(&(-3i32).to_be_bytes());
        assert!(matches!(Annotation::parse(&bytes), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_classification_out_of_table() {
        assert!(Annotation::new(vec![3], aparc_entries()).is_err());
    }
}
