pub mod generator;
pub mod observation;
#[allow(clippy::module_inception)]
pub mod pileup;
pub mod read_data;

pub use generator::PileupGenerator;
pub use observation::Observation;
pub use pileup::Pileup;
pub use read_data::{
    load_runnie, runlength_encode, FastaRunlengthSource, MemoryReadSource, ReadData,
    ReadDataSource,
};
