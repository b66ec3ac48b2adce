use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, ScenescribeError};

/// Video container extensions the pipeline will pick up.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Which part of the file name the ledger keys its processed set on.
///
/// The split ledger records the bare stem (`a` for `a.mp4`); the transcribe
/// ledger records the full file name. The gate has to compare against the
/// same value the ledger stores or resumability breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedKey {
    Stem,
    FileName,
}

impl ProcessedKey {
    pub fn of(&self, file_name: &str) -> String {
        match self {
            ProcessedKey::Stem => Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string()),
            ProcessedKey::FileName => file_name.to_string(),
        }
    }
}

fn has_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Reject a pending list where two files share a stem (`a.mp4` next to
/// `a.mkv`): both pipelines key artifact names on the stem, so processing
/// them in one run would silently overwrite clips and duplicate ledger rows.
pub fn ensure_unique_stems(pending: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for file_name in pending {
        let stem = ProcessedKey::Stem.of(file_name);
        if !seen.insert(stem.clone()) {
            return Err(ScenescribeError::InputConflict(format!(
                "multiple videos named '{stem}' with different extensions; \
artifact names would collide"
            )));
        }
    }
    Ok(())
}

/// Count video files in `dir`, processed or not.
pub fn count_videos(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Err(ScenescribeError::FileNotFound(dir.display().to_string()));
    }
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && has_allowed_extension(&entry.file_name().to_string_lossy())
        {
            count += 1;
        }
    }
    Ok(count)
}

/// List video files in `dir` that are not yet in the ledger's processed set.
///
/// Returns file names sorted lexicographically so repeated runs walk the
/// folder in the same order. Extension matching is case-insensitive, so
/// `CLIP.MP4` is picked up alongside `clip.mp4`.
pub fn list_pending(
    dir: &Path,
    processed: &HashSet<String>,
    key: ProcessedKey,
) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(ScenescribeError::FileNotFound(dir.display().to_string()));
    }

    let mut pending = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !has_allowed_extension(&file_name) {
            debug!("Skipping non-video file: {}", file_name);
            continue;
        }
        if processed.contains(&key.of(&file_name)) {
            debug!("Skipping already processed video: {}", file_name);
            continue;
        }
        pending.push(file_name);
    }

    pending.sort();
    Ok(pending)
}
