pub mod caller;
pub mod config;
pub mod evidence;
pub mod weibull;

pub use caller::{BayesianConsensusCaller, ConsensusCall};
pub use config::{ConsensusConfig, ConsensusFlags};
pub use evidence::{Evidence, RunLength};
pub use weibull::WeibullParams;
