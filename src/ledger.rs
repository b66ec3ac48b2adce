//! The CSV manifest that doubles as the resumability checkpoint.
//!
//! One ledger file per output folder. On open, the header is validated and
//! the processed set is rebuilt from the key column; appends go through a
//! per-video buffer so a video only ever shows up all-or-nothing.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ScenescribeError};

/// One row of the split ledger: a scene of a whole-folder split run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub video_name: String,
    pub scene_number: usize,
    pub start_time: f64,
    pub end_time: f64,
}

/// One row of the transcribe ledger: a scene with its artifacts and text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub video: String,
    pub screen_nr: String,
    pub scene: String,
    pub image: String,
    pub start_time: f64,
    pub end_time: f64,
    pub transcription: String,
}

/// Which of the two row shapes a ledger file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Split,
    Transcribe,
}

impl Schema {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Schema::Split => &["video_name", "scene_number", "start_time", "end_time"],
            Schema::Transcribe => &[
                "video",
                "screen_nr",
                "scene",
                "image",
                "start_time",
                "end_time",
                "transcription",
            ],
        }
    }
}

pub struct Ledger {
    path: PathBuf,
    schema: Schema,
    processed: HashSet<String>,
}

impl Ledger {
    /// Open the ledger at `path`, creating it with its header row if absent.
    ///
    /// An existing file must start with exactly the schema's header;
    /// anything else is a corrupt ledger and a hard error, never a guess.
    pub fn open(path: &Path, schema: Schema) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(schema.header())?;
            writer.flush()?;
            info!("Created ledger {}", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                schema,
                processed: HashSet::new(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers().map_err(|e| ScenescribeError::CorruptLedger {
            path: path.to_path_buf(),
            reason: format!("unreadable header: {e}"),
        })?;
        if headers.is_empty() || headers.iter().eq([""]) {
            return Err(ScenescribeError::CorruptLedger {
                path: path.to_path_buf(),
                reason: "missing header row".to_string(),
            });
        }
        if !headers.iter().eq(schema.header().iter().copied()) {
            return Err(ScenescribeError::CorruptLedger {
                path: path.to_path_buf(),
                reason: format!(
                    "header mismatch: expected {:?}, found {:?}",
                    schema.header(),
                    headers
                ),
            });
        }

        // The key column (the first) defines the processed set
        let mut processed = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(|e| ScenescribeError::CorruptLedger {
                path: path.to_path_buf(),
                reason: format!("unreadable row: {e}"),
            })?;
            if let Some(key) = record.get(0) {
                processed.insert(key.to_string());
            }
        }

        debug!(
            "Loaded ledger {} with {} processed videos",
            path.display(),
            processed.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            schema,
            processed,
        })
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// The set of video keys already logged. This is the exact definition of
    /// "already processed" for the scanner.
    pub fn processed(&self) -> &HashSet<String> {
        &self.processed
    }

    pub fn is_processed(&self, key: &str) -> bool {
        self.processed.contains(key)
    }

    /// Append all of one video's rows in a single flush.
    ///
    /// Callers buffer rows until the video is fully materialized, so a crash
    /// before this point leaves the video entirely absent from the ledger
    /// and the next run redoes it from scratch.
    pub fn append_video<S: Serialize>(&mut self, key: &str, rows: &[S]) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        self.processed.insert(key.to_string());
        debug!("Logged {} rows for {}", rows.len(), key);
        Ok(())
    }
}
