use super::Result;
use flate2::read::MultiGzDecoder;
use rust_htslib::faidx;
use std::fs::File;
use std::io::{BufRead, BufReader, Read as ioRead};
use std::path::{Path, PathBuf};

/// Opens a plain or gzip-compressed text resource (consensus model, Runnie output).
pub fn open_text_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead>>> {
    fn is_gzipped(path: &Path) -> bool {
        let path_str = path.to_string_lossy().to_lowercase();
        path_str.ends_with(".gz") || path_str.ends_with(".gzip")
    }
    let file = File::open(path).map_err(|e| format!("File {}: {}", path.display(), e))?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(format!("Invalid gzip header: {}", path.to_string_lossy()))
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

fn fasta_index_path(path: &Path) -> Result<PathBuf> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| format!("FASTA path has no extension: {}", path.display()))?;
    let fai_path = path.with_extension(extension.to_owned() + ".fai");
    if !fai_path.exists() {
        return Err(format!(
            "FASTA index file not found: {}. Create it using 'samtools faidx {}'",
            fai_path.display(),
            path.display()
        ));
    }
    Ok(fai_path)
}

/// Opens an indexed FASTA. Both the reference and the reads FASTA go through here.
pub fn open_genome_reader(path: &Path) -> Result<faidx::Reader> {
    fasta_index_path(path)?;
    faidx::Reader::from_path(path).map_err(|e| e.to_string())
}

/// Sequence names and lengths listed in the FASTA index, in index order.
pub fn contig_lengths_from_fasta(path: &Path) -> Result<Vec<(String, u64)>> {
    let fai_path = fasta_index_path(path)?;
    let mut contigs = Vec::new();
    for (line_number, line) in open_text_reader(&fai_path)?.lines().enumerate() {
        let line = line.map_err(|e| format!("{}: {}", fai_path.display(), e))?;
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(name), Some(length)) = (fields.next(), fields.next()) else {
            return Err(format!(
                "{}: malformed index line {}",
                fai_path.display(),
                line_number + 1
            ));
        };
        let length = length.parse::<u64>().map_err(|_| {
            format!(
                "{}: invalid length at line {}: {}",
                fai_path.display(),
                line_number + 1,
                length
            )
        })?;
        contigs.push((name.to_string(), length));
    }
    Ok(contigs)
}
