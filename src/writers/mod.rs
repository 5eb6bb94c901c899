mod write_fasta;

pub use write_fasta::FastaWriter;
