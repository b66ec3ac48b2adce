use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Result, ScenescribeError};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        ScenescribeError::Extraction(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(ScenescribeError::Extraction(
            "FFmpeg check failed".to_string(),
        ));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            ScenescribeError::Extraction(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(ScenescribeError::Extraction(
            "FFprobe check failed".to_string(),
        ));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Get a media file's duration in seconds using FFprobe.
pub fn media_duration(input: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| ScenescribeError::Extraction(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScenescribeError::Extraction(format!(
            "FFprobe failed: {stderr}"
        )));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str.trim().parse().map_err(|e| {
        ScenescribeError::Extraction(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })
}

/// Re-encode one scene of `input` into its own clip.
///
/// Seeks to `start_secs` and encodes `end_secs - start_secs` seconds with
/// H.264 video and AAC audio, the container chosen by the output extension.
pub fn extract_clip(input: &Path, output: &Path, start_secs: f64, end_secs: f64) -> Result<()> {
    let duration = end_secs - start_secs;
    if duration <= 0.0 {
        return Err(ScenescribeError::Extraction(format!(
            "Scene duration is not positive: start={start_secs}, end={end_secs}"
        )));
    }

    debug!(
        "Extracting clip {} [{:.3}s +{:.3}s]",
        output.display(),
        start_secs,
        duration
    );

    let status = Command::new("ffmpeg")
        .args(["-y", "-ss"])
        .arg(format!("{start_secs:.3}"))
        .arg("-i")
        .arg(input)
        .arg("-t")
        .arg(format!("{duration:.3}"))
        .args(["-c:v", "libx264", "-preset", "fast", "-c:a", "aac"])
        .arg(output)
        .status()
        .map_err(|e| ScenescribeError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(ScenescribeError::Extraction(format!(
            "FFmpeg clip extraction failed for {}",
            output.display()
        )));
    }

    if !output.exists() {
        return Err(ScenescribeError::Extraction(format!(
            "Clip was not created: {}",
            output.display()
        )));
    }

    Ok(())
}

/// Save one representative still frame as a JPEG.
pub fn extract_thumbnail(input: &Path, output: &Path, at_secs: f64) -> Result<()> {
    debug!("Extracting thumbnail {} at {:.3}s", output.display(), at_secs);

    let status = Command::new("ffmpeg")
        .args(["-y", "-ss"])
        .arg(format!("{at_secs:.3}"))
        .arg("-i")
        .arg(input)
        .args(["-frames:v", "1", "-q:v", "2"])
        .arg(output)
        .status()
        .map_err(|e| ScenescribeError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(ScenescribeError::Extraction(format!(
            "FFmpeg thumbnail extraction failed for {}",
            output.display()
        )));
    }

    if !output.exists() {
        return Err(ScenescribeError::Extraction(format!(
            "Thumbnail was not created: {}",
            output.display()
        )));
    }

    Ok(())
}

/// Demux and encode a clip's audio track to MP3 for the transcriber.
pub fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(ScenescribeError::FileNotFound(input.display().to_string()));
    }

    info!("Extracting audio from {}", input.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "libmp3lame", "-q:a", "4"])
        .arg(output)
        .status()
        .map_err(|e| ScenescribeError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(ScenescribeError::Extraction(
            "FFmpeg audio extraction failed".to_string(),
        ));
    }

    if !output.exists() {
        return Err(ScenescribeError::Extraction(
            "Audio file was not created".to_string(),
        ));
    }

    Ok(())
}
