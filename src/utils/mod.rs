mod bam_utils;
mod io_utils;
pub mod math;
mod readers;
mod region;
mod util;

pub use bam_utils::{contig_lengths_from_header, get_bam_header, is_bam_mapped};
pub use io_utils::create_writer;
pub use readers::{contig_lengths_from_fasta, open_genome_reader, open_text_reader};
pub use region::{chunk_sequence, chunk_sequences, Region};
pub use util::{handle_error_and_exit, Result};
