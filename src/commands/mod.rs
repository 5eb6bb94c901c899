pub mod consensus;
pub mod pileup;
pub mod validate;
