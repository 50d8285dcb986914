//! Hyperparameter sweep module
//!
//! Provides the configuration space of pipeline candidates, the strategy
//! that walks it and the driver that scores each candidate by stratified
//! cross-validation, refits the winner and evaluates it on a hold-out split.

mod config;
mod search_space;
mod sweep;

pub use config::TrainingConfig;
pub use search_space::{ConfigSpace, ExhaustiveSearch, SearchStrategy};
pub use sweep::{SweepDriver, SweepReport, TrainingOutcome, TrialResult};
