//! Defines the `FastaWriter` used to emit one consensus record per region.

use crate::utils::Result;
use std::fs::File;
use std::io::{BufWriter, Write};

pub struct FastaWriter<W: Write = BufWriter<File>> {
    writer: W,
    records_written: usize,
}

impl FastaWriter<BufWriter<File>> {
    pub fn new(output_path: &str) -> Result<Self> {
        let file = File::create(output_path)
            .map_err(|e| format!("Invalid FASTA output path {}: {}", output_path, e))?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> FastaWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    /// Writes `>name` followed by the whole sequence on one line.
    pub fn write_record(&mut self, name: &str, sequence: &[u8]) -> Result<()> {
        writeln!(self.writer, ">{}", name).map_err(|e| e.to_string())?;
        self.writer.write_all(sequence).map_err(|e| e.to_string())?;
        self.writer.write_all(b"\n").map_err(|e| e.to_string())?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| e.to_string())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_records_one_line_each() {
        let mut writer = FastaWriter::from_writer(Vec::new());
        let sequence = vec![b'A'; 85];
        writer.write_record("chr1_0-100", &sequence).unwrap();
        writer.write_record("chr2_0-4", b"ACGT").unwrap();
        assert_eq!(writer.records_written(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], ">chr1_0-100");
        assert_eq!(lines[1].len(), 85);
        assert_eq!(&lines[2..], &[">chr2_0-4", "ACGT"]);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fasta");
        let mut writer = FastaWriter::new(path.to_str().unwrap()).unwrap();
        writer.write_record("r", b"GATTACA").unwrap();
        writer.flush().unwrap();
        drop(writer);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ">r\nGATTACA\n");
    }

    #[test]
    fn test_invalid_output_path_err() {
        assert!(FastaWriter::new("/nonexistent/dir/out.fasta").is_err());
    }
}
