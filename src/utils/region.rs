use crate::utils::Result;
use std::fmt;

/// A chunk of one reference contig, in 0-based half-open coordinates `[start, stop)`.
///
/// Regions are the unit of parallel work: the consensus workflow builds one immutable
/// list of them up front and every worker pulls the next index from a shared counter.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Region {
    pub name: String,
    pub start: u64,
    pub stop: u64,
}

impl Region {
    pub fn new(name: impl Into<String>, start: u64, stop: u64) -> Result<Self> {
        if start >= stop {
            return Err(format!("Invalid region: start {} >= stop {}", start, stop));
        }

        Ok(Self {
            name: name.into(),
            start,
            stop,
        })
    }

    pub fn from_string(encoding: &str) -> Result<Self> {
        let error_msg = || format!("Invalid region encoding: {}", encoding);
        let (name, interval) = encoding.rsplit_once(':').ok_or_else(error_msg)?;
        let (start, stop) = interval.split_once('-').ok_or_else(error_msg)?;

        if name.is_empty() {
            return Err(error_msg());
        }

        let start: u64 = start.parse().map_err(|_| error_msg())?;
        let stop: u64 = stop.parse().map_err(|_| error_msg())?;

        Self::new(name, start, stop)
    }

    /// Number of reference columns covered by the region.
    pub fn width(&self) -> usize {
        (self.stop - self.start) as usize
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}-{}", self.name, self.start, self.stop)
    }
}

/// Split a contig of `length` bases into consecutive regions of at most `chunk_size` bases.
pub fn chunk_sequence(regions: &mut Vec<Region>, name: &str, chunk_size: u64, length: u64) {
    let mut start = 0;
    while start < length {
        let stop = std::cmp::min(start + chunk_size, length);
        regions.push(Region {
            name: name.to_string(),
            start,
            stop,
        });
        start = stop;
    }
}

pub fn chunk_sequences(contigs: &[(String, u64)], chunk_size: u64) -> Result<Vec<Region>> {
    if chunk_size == 0 {
        return Err("Chunk size must be at least 1".to_string());
    }
    let mut regions = Vec::new();
    for (name, length) in contigs {
        chunk_sequence(&mut regions, name, chunk_size, *length);
    }
    Ok(regions)
}
