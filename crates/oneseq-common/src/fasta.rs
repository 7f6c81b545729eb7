//! FASTA records and I/O.
//!
//! Proteome files are plain protein FASTA. Headers are split at the first
//! whitespace into id and description; the writer wraps sequence lines at 80
//! columns, matching the files the data package ships.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OneSeqError, Result};

const LINE_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

impl FastaRecord {
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into(), desc: None, seq: seq.into() }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Parses FASTA text. Sequence lines are uppercased; whitespace inside
/// sequences is dropped. Records with no header line are an error.
pub fn parse_str(text: &str) -> Result<Vec<FastaRecord>> {
    let mut records: Vec<FastaRecord> = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            let header = header.trim();
            if header.is_empty() {
                return Err(OneSeqError::Fasta(format!(
                    "empty header at line {}",
                    lineno + 1
                )));
            }
            let (id, desc) = match header.split_once(char::is_whitespace) {
                Some((id, rest)) => (id.to_string(), Some(rest.trim().to_string())),
                None => (header.to_string(), None),
            };
            records.push(FastaRecord { id, desc, seq: Vec::new() });
        } else {
            let current = records.last_mut().ok_or_else(|| {
                OneSeqError::Fasta(format!(
                    "sequence data before first header at line {}",
                    lineno + 1
                ))
            })?;
            current
                .seq
                .extend(line.bytes().filter(|b| !b.is_ascii_whitespace()).map(|b| b.to_ascii_uppercase()));
        }
    }
    Ok(records)
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<FastaRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        OneSeqError::Fasta(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_str(&text)
}

pub fn write_records<W: Write>(out: &mut W, records: &[FastaRecord]) -> Result<()> {
    for rec in records {
        match &rec.desc {
            Some(desc) => writeln!(out, ">{} {}", rec.id, desc)?,
            None => writeln!(out, ">{}", rec.id)?,
        }
        for chunk in rec.seq.chunks(LINE_WIDTH) {
            out.write_all(chunk)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn write_file(path: impl AsRef<Path>, records: &[FastaRecord]) -> Result<()> {
    let file = fs::File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    write_records(&mut out, records)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic() {
        let recs = parse_str(">p1 first protein\nMKV\nLLT\n>p2\nacdef\n").unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].id, "p1");
        assert_eq!(recs[0].desc.as_deref(), Some("first protein"));
        assert_eq!(recs[0].seq, b"MKVLLT");
        assert_eq!(recs[1].id, "p2");
        assert_eq!(recs[1].desc, None);
        assert_eq!(recs[1].seq, b"ACDEF");
    }

    #[test]
    fn test_parse_rejects_headerless_data() {
        assert!(parse_str("MKVLLT\n").is_err());
        assert!(parse_str(">\nMKV\n").is_err());
    }

    #[test]
    fn test_write_wraps_at_80() {
        let rec = FastaRecord::new("long", vec![b'A'; 200]);
        let mut buf = Vec::new();
        write_records(&mut buf, &[rec]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">long");
        assert_eq!(lines[1].len(), 80);
        assert_eq!(lines[2].len(), 80);
        assert_eq!(lines[3].len(), 40);
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.fa");
        let recs = vec![
            FastaRecord { id: "a".into(), desc: Some("desc".into()), seq: b"MKVLLT".to_vec() },
            FastaRecord::new("b", b"ACDEFGHIKLMNPQRSTVWY".to_vec()),
        ];
        write_file(&path, &recs).unwrap();
        let back = read_file(&path).unwrap();
        assert_eq!(back, recs);
    }
}
