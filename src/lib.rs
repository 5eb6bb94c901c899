pub mod alignment;
pub mod cli;
pub mod commands;
pub mod consensus;
pub mod pileup;
pub mod utils;
pub mod workflows;
pub mod writers;
