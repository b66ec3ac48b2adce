use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenescribeError {
    #[error("Scene detection failed: {0}")]
    SceneDetection(String),

    #[error("FFmpeg extraction failed: {0}")]
    Extraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Conflicting inputs: {0}")]
    InputConflict(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Corrupt ledger {path}: {reason}")]
    CorruptLedger { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScenescribeError>;
