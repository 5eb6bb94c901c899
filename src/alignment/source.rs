use super::segment::AlignedSegment;
use crate::utils::{Region, Result};
use rust_htslib::bam::{self, Read, Record};
use std::path::Path;

/// Anything that can hand out the alignments overlapping a region.
pub trait AlignmentSource {
    fn fetch_segments(&mut self, region: &Region) -> Result<Vec<AlignedSegment>>;
}

/// Reads primary, mapped alignments from an indexed BAM file.
pub struct BamAlignmentSource {
    reader: bam::IndexedReader,
    header: bam::HeaderView,
    min_mapq: u8,
}

impl BamAlignmentSource {
    pub fn new(path: &Path, min_mapq: u8) -> Result<Self> {
        let reader = bam::IndexedReader::from_path(path)
            .map_err(|e| format!("Failed to open BAM {}: {}", path.display(), e))?;
        let header = reader.header().clone();
        Ok(Self {
            reader,
            header,
            min_mapq,
        })
    }
}

impl AlignmentSource for BamAlignmentSource {
    fn fetch_segments(&mut self, region: &Region) -> Result<Vec<AlignedSegment>> {
        self.reader
            .fetch((region.name.as_str(), region.start as i64, region.stop as i64))
            .map_err(|e| format!("Fetch error for region {}: {}", region, e))?;

        let mut segments = Vec::new();
        let mut n_filtered = 0;
        let mut record = Record::new();
        while let Some(result) = self.reader.read(&mut record) {
            result.map_err(|e| e.to_string())?;
            if record.is_unmapped() || record.is_secondary() || record.is_supplementary() {
                continue;
            }
            if record.mapq() < self.min_mapq {
                n_filtered += 1;
                continue;
            }
            segments.push(AlignedSegment::from_bam_record(&record, &self.header)?);
        }

        log::trace!(
            "{}: fetched {} alignments, {} below minimum MAPQ",
            region,
            segments.len(),
            n_filtered
        );
        Ok(segments)
    }
}

/// Alignments held in memory, sorted by reference start.
#[derive(Debug, Default, Clone)]
pub struct MemoryAlignmentSource {
    segments: Vec<AlignedSegment>,
}

impl MemoryAlignmentSource {
    pub fn new(mut segments: Vec<AlignedSegment>) -> Self {
        segments.sort_by_key(|s| s.ref_start);
        Self { segments }
    }
}

impl AlignmentSource for MemoryAlignmentSource {
    fn fetch_segments(&mut self, region: &Region) -> Result<Vec<AlignedSegment>> {
        Ok(self
            .segments
            .iter()
            .filter(|s| s.ref_name == region.name)
            .filter(|s| {
                let start = s.ref_start - 1;
                let end = s.infer_reference_stop();
                start < region.stop as i64 && end > region.start as i64
            })
            .cloned()
            .collect())
    }
}
