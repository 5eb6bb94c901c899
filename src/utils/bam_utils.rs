use crate::utils::Result;
use rust_htslib::bam::{self, Read};
use std::path::Path;

pub fn get_bam_header(bam_path: &Path) -> Result<bam::HeaderView> {
    let bam = bam::IndexedReader::from_path(bam_path)
        .map_err(|e| format!("Failed to create bam reader: {}", e))?;
    Ok(bam.header().clone())
}

pub fn is_bam_mapped(bam_header: &bam::HeaderView) -> bool {
    // Fetching by region needs @SQ lines in the header.
    bam_header.target_count() > 0
}

/// Reference contig names and lengths, in header order.
pub fn contig_lengths_from_header(bam_header: &bam::HeaderView) -> Result<Vec<(String, u64)>> {
    (0..bam_header.target_count())
        .map(|tid| {
            let name = String::from_utf8_lossy(bam_header.tid2name(tid)).to_string();
            let length = bam_header
                .target_len(tid)
                .ok_or_else(|| format!("Missing length for contig {} in BAM header", name))?;
            Ok((name, length))
        })
        .collect()
}
