pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod pipeline;
pub mod scan;
pub mod transcribe;

pub use config::Config;
pub use error::{Result, ScenescribeError};
pub use pipeline::{
    print_summary, run_split, run_transcribe, PipelineStats, SplitOptions, TranscribeOptions,
};
