//! Per-read base and run-length channels, looked up by read name.

use super::observation::{base_to_code, Observation};
use crate::alignment::{CigarOp, Coordinate};
use crate::consensus::{RunLength, WeibullParams};
use crate::utils::{open_genome_reader, Result};
use rust_htslib::faidx;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// One read in sequencing orientation: a base code and an evidence value per position.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadData<E> {
    pub name: String,
    pub bases: Vec<u8>,
    pub evidence: Vec<E>,
}

impl<E: Copy + Default> ReadData<E> {
    /// `sequence` holds nucleotide letters; they are stored as base codes.
    pub fn new(name: &str, sequence: &[u8], evidence: Vec<E>) -> Result<Self> {
        if sequence.len() != evidence.len() {
            return Err(format!(
                "Read {} has {} bases but {} evidence values",
                name,
                sequence.len(),
                evidence.len()
            ));
        }
        let bases = sequence
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                base_to_code(b).ok_or_else(|| {
                    format!("Read {} has invalid base '{}' at {}", name, b as char, i)
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        Ok(Self {
            name: name.to_string(),
            bases,
            evidence,
        })
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// The read's contribution at one walk step.
    ///
    /// Operations that consume no read base (deletions, skips) produce a gap.
    pub fn observation(
        &self,
        coordinate: &Coordinate,
        op: &CigarOp,
        reverse: bool,
    ) -> Result<Observation<E>> {
        if !op.consumes_read() {
            return Ok(Observation::gap(reverse));
        }
        let index = coordinate.read_true_index;
        if index < 0 || index as usize >= self.len() {
            return Err(format!(
                "True-read index {} out of bounds for read {} of length {}",
                index,
                self.name,
                self.len()
            ));
        }
        let index = index as usize;
        Ok(Observation {
            base: self.bases[index],
            reverse,
            evidence: self.evidence[index],
        })
    }
}

/// Supplies the evidence channels of reads by name.
pub trait ReadDataSource {
    type Evidence: Copy + Default;

    fn fetch_read(&mut self, name: &str) -> Result<ReadData<Self::Evidence>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryReadSource<E> {
    reads: HashMap<String, ReadData<E>>,
}

impl<E: Copy + Default> MemoryReadSource<E> {
    pub fn new() -> Self {
        Self {
            reads: HashMap::new(),
        }
    }

    pub fn insert(&mut self, read: ReadData<E>) -> Result<()> {
        if self.reads.contains_key(&read.name) {
            return Err(format!("Duplicate read {}", read.name));
        }
        self.reads.insert(read.name.clone(), read);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

impl<E: Copy + Default> ReadDataSource for MemoryReadSource<E> {
    type Evidence = E;

    fn fetch_read(&mut self, name: &str) -> Result<ReadData<E>> {
        self.reads
            .get(name)
            .cloned()
            .ok_or_else(|| format!("Read {} not found in read data", name))
    }
}

impl<E: Copy + Default> ReadDataSource for &MemoryReadSource<E> {
    type Evidence = E;

    fn fetch_read(&mut self, name: &str) -> Result<ReadData<E>> {
        self.reads
            .get(name)
            .cloned()
            .ok_or_else(|| format!("Read {} not found in read data", name))
    }
}

/// Collapses homopolymers: `AAACG` becomes `ACG` with lengths `3,1,1`.
pub fn runlength_encode(sequence: &[u8]) -> (Vec<u8>, Vec<RunLength>) {
    let mut bases = Vec::new();
    let mut lengths: Vec<RunLength> = Vec::new();
    for &base in sequence {
        let base = base.to_ascii_uppercase();
        match (bases.last(), lengths.last_mut()) {
            (Some(&last), Some(length)) if last == base => {
                length.0 = length.0.saturating_add(1);
            }
            _ => {
                bases.push(base);
                lengths.push(RunLength(1));
            }
        }
    }
    (bases, lengths)
}

/// Reads from an indexed FASTA, run-length encoded as they are fetched.
pub struct FastaRunlengthSource {
    reader: faidx::Reader,
}

impl FastaRunlengthSource {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: open_genome_reader(path)?,
        })
    }
}

impl ReadDataSource for FastaRunlengthSource {
    type Evidence = RunLength;

    fn fetch_read(&mut self, name: &str) -> Result<ReadData<RunLength>> {
        let length = self.reader.fetch_seq_len(name);
        let length = u64::try_from(length)
            .map_err(|_| format!("Read {} not found in reads FASTA", name))?;
        if length == 0 || length > u32::MAX as u64 {
            return Err(format!("Read {} not found in reads FASTA", name));
        }
        let sequence = self
            .reader
            .fetch_seq_string(name, 0, length as usize - 1)
            .map_err(|e| format!("Error fetching read {}: {}", name, e))?;
        let (bases, lengths) = runlength_encode(sequence.as_bytes());
        ReadData::new(name, &bases, lengths)
    }
}

/// Parses Runnie text output: a `# name` header per read followed by
/// `BASE<TAB>SHAPE<TAB>SCALE` rows, one per run-length encoded base.
pub fn load_runnie<R: BufRead>(reader: R) -> Result<MemoryReadSource<WeibullParams>> {
    fn finish(
        source: &mut MemoryReadSource<WeibullParams>,
        name: Option<String>,
        bases: &mut Vec<u8>,
        params: &mut Vec<WeibullParams>,
    ) -> Result<()> {
        if let Some(name) = name {
            let read = ReadData::new(&name, bases, std::mem::take(params))?;
            bases.clear();
            source.insert(read)?;
        }
        Ok(())
    }

    let mut source = MemoryReadSource::new();
    let mut name: Option<String> = None;
    let mut bases = Vec::new();
    let mut params = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let line = line.trim_end();
        let line_number = index + 1;
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('#') {
            finish(&mut source, name.take(), &mut bases, &mut params)?;
            let header = header.trim();
            if header.is_empty() {
                return Err(format!("Runnie line {}: empty read name", line_number));
            }
            name = Some(header.to_string());
            continue;
        }
        if name.is_none() {
            return Err(format!("Runnie line {}: row before first read header", line_number));
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let (base, shape, scale) = match fields.as_slice() {
            [base, shape, scale] => (*base, *shape, *scale),
            _ => {
                return Err(format!(
                    "Runnie line {}: expected 3 tab-separated fields, found {}",
                    line_number,
                    fields.len()
                ))
            }
        };
        let parse = |field: &str| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Runnie line {}: invalid number '{}'", line_number, field))
        };
        let weibull = WeibullParams::new(parse(scale)?, parse(shape)?);
        if !weibull.is_valid() {
            return Err(format!(
                "Runnie line {}: Weibull parameters must be positive",
                line_number
            ));
        }
        match base.as_bytes() {
            [b] => bases.push(*b),
            _ => return Err(format!("Runnie line {}: invalid base '{}'", line_number, base)),
        }
        params.push(weibull);
    }
    finish(&mut source, name, &mut bases, &mut params)?;

    log::debug!("Loaded {} Runnie reads", source.len());
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::CigarKind;
    use std::io::{Cursor, Write};

    fn step(true_index: i64) -> Coordinate {
        Coordinate {
            ref_index: 0,
            read_index: 0,
            read_true_index: true_index,
        }
    }

    #[test]
    fn test_runlength_encode() {
        let (bases, lengths) = runlength_encode(b"AAACGgTTTT");
        assert_eq!(bases, b"ACGT".to_vec());
        let lengths: Vec<u16> = lengths.into_iter().map(|l| l.0).collect();
        assert_eq!(lengths, vec![3, 1, 2, 4]);
        let (bases, lengths) = runlength_encode(b"");
        assert!(bases.is_empty() && lengths.is_empty());
    }

    #[test]
    fn test_observation_lookup() {
        let read = ReadData::new("r1", b"ACG", vec![RunLength(2), RunLength(1), RunLength(5)])
            .unwrap();
        let matched = CigarOp::new(CigarKind::Match, 3);
        let observation = read.observation(&step(2), &matched, true).unwrap();
        assert_eq!(observation.base, 2);
        assert!(observation.reverse);
        assert_eq!(observation.evidence, RunLength(5));

        let deleted = CigarOp::new(CigarKind::Delete, 1);
        let observation = read.observation(&step(9), &deleted, false).unwrap();
        assert!(observation.is_gap());
    }

    #[test]
    fn test_observation_out_of_bounds_err() {
        let read = ReadData::new("short_read", b"AC", vec![RunLength(1); 2]).unwrap();
        let matched = CigarOp::new(CigarKind::Match, 1);
        let err = read.observation(&step(2), &matched, false).unwrap_err();
        assert!(err.contains("short_read"));
        assert!(err.contains("length 2"));
    }

    #[test]
    fn test_read_data_validation() {
        assert!(ReadData::new("r", b"AC", vec![RunLength(1)]).is_err());
        assert!(ReadData::new("r", b"AN", vec![RunLength(1); 2]).is_err());
    }

    #[test]
    fn test_memory_source() {
        let mut source = MemoryReadSource::new();
        source
            .insert(ReadData::new("r1", b"A", vec![RunLength(3)]).unwrap())
            .unwrap();
        assert!(source
            .insert(ReadData::new("r1", b"C", vec![RunLength(1)]).unwrap())
            .is_err());
        assert_eq!(source.fetch_read("r1").unwrap().bases, vec![0]);
        assert!(source.fetch_read("missing").is_err());
    }

    #[test]
    fn test_load_runnie() {
        let text = "# read_a\nA\t2.0\t1.5\nC\t1.0\t3.0\n# read_b\nT\t4.0\t2.5\n";
        let mut source = load_runnie(Cursor::new(text)).unwrap();
        assert_eq!(source.len(), 2);
        let read = source.fetch_read("read_a").unwrap();
        assert_eq!(read.bases, vec![0, 1]);
        assert_eq!(read.evidence[0], WeibullParams::new(1.5, 2.0));
        assert_eq!(read.evidence[1], WeibullParams::new(3.0, 1.0));
        assert_eq!(source.fetch_read("read_b").unwrap().len(), 1);
    }

    #[test]
    fn test_load_runnie_errors() {
        assert!(load_runnie(Cursor::new("A\t1\t1\n")).is_err());
        assert!(load_runnie(Cursor::new("# r\nA\t1\n")).is_err());
        assert!(load_runnie(Cursor::new("# r\nA\t-1\t1\n")).is_err());
        assert!(load_runnie(Cursor::new("# r\nA\t1\t1\n# r\nC\t1\t1\n")).is_err());
    }

    #[test]
    fn test_fasta_runlength_source() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = dir.path().join("reads.fasta");
        let mut file = std::fs::File::create(&fasta).unwrap();
        writeln!(file, ">read_1\nAAACCGT\n>read_2\nGG").unwrap();
        let fai = dir.path().join("reads.fasta.fai");
        let mut index = std::fs::File::create(&fai).unwrap();
        writeln!(index, "read_1\t7\t8\t7\t8\nread_2\t2\t24\t2\t3").unwrap();

        let mut source = FastaRunlengthSource::new(&fasta).unwrap();
        let read = source.fetch_read("read_1").unwrap();
        assert_eq!(read.bases, vec![0, 1, 2, 3]);
        let lengths: Vec<u16> = read.evidence.iter().map(|l| l.0).collect();
        assert_eq!(lengths, vec![3, 2, 1, 1]);
        assert_eq!(source.fetch_read("read_2").unwrap().evidence, vec![RunLength(2)]);
    }
}
