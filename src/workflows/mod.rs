pub mod polish;

pub use polish::{call_region, polish_regions, process_region, PolishSummary};
