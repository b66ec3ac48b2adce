use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::error::{Result, ScenescribeError};
use crate::extract;

/// A detected scene: a contiguous temporal segment of the source video.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// 1-based scene number in temporal order.
    pub number: usize,
    /// Start of the scene in seconds.
    pub start_secs: f64,
    /// End of the scene in seconds (exclusive).
    pub end_secs: f64,
}

impl Scene {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Midpoint of the scene, where the representative thumbnail is taken.
    pub fn midpoint_secs(&self) -> f64 {
        self.start_secs + self.duration_secs() / 2.0
    }
}

/// Detect scene boundaries with FFmpeg's scdet filter and turn them into an
/// ordered list of scenes tiling the whole video.
///
/// The scdet filter logs candidate cuts to stderr as
/// `[scdet @ ...] lavfi.scd.score: X.XXX, lavfi.scd.time: Y.YYY`.
/// Cuts scoring below the threshold or arriving within `min_scene_duration`
/// of the previous accepted cut are dropped. A video with no accepted cut
/// yields a single scene spanning the full duration, so every scanned video
/// produces at least one record.
pub fn detect_scenes(video_path: &Path, config: &DetectorConfig) -> Result<Vec<Scene>> {
    if !video_path.exists() {
        return Err(ScenescribeError::FileNotFound(
            video_path.display().to_string(),
        ));
    }

    let duration = extract::media_duration(video_path)?;

    info!(
        "Detecting scenes in {} (threshold {}, duration {:.2}s)",
        video_path.display(),
        config.threshold,
        duration
    );

    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(video_path)
        .arg("-vf")
        // scdet thresholds are given as a fraction of the 0-100 score scale
        .arg(format!("scdet=t={}:s=1", config.threshold / 100.0))
        .arg("-an")
        .arg("-f")
        .arg("null")
        .arg("-")
        .output()
        .map_err(|e| {
            ScenescribeError::SceneDetection(format!("Failed to execute ffmpeg: {e}"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScenescribeError::SceneDetection(format!(
            "ffmpeg scdet pass failed: {}",
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let cuts = collect_cuts(&stderr, config, duration);

    Ok(scenes_from_cuts(&cuts, duration))
}

/// Parse accepted cut timestamps out of the scdet stderr log.
fn collect_cuts(stderr: &str, config: &DetectorConfig, duration: f64) -> Vec<f64> {
    let mut cuts: Vec<f64> = Vec::new();

    for line in stderr.lines() {
        if !line.contains("lavfi.scd.score") || !line.contains("lavfi.scd.time") {
            continue;
        }
        let Some((score_str, time_str)) = parse_scdet_line(line) else {
            warn!("Unparseable scdet line: {}", line);
            continue;
        };
        let (Ok(score), Ok(timestamp)) = (score_str.parse::<f64>(), time_str.parse::<f64>())
        else {
            warn!("Bad scdet numbers: {} | {}", score_str, time_str);
            continue;
        };

        if score < config.threshold {
            continue;
        }
        // Cuts at the very edges would create empty scenes, and a cut close
        // to the end would leave a final scene shorter than the minimum
        if timestamp <= 0.0 || timestamp >= duration {
            continue;
        }
        if duration - timestamp < config.min_scene_duration {
            debug!(
                "Dropping cut at {:.2}s, too close to end of video at {:.2}s",
                timestamp, duration
            );
            continue;
        }
        if let Some(&last) = cuts.last() {
            if timestamp - last < config.min_scene_duration {
                debug!(
                    "Dropping cut at {:.2}s, too close to previous at {:.2}s",
                    timestamp, last
                );
                continue;
            }
        } else if timestamp < config.min_scene_duration {
            continue;
        }
        cuts.push(timestamp);
    }

    cuts
}

/// Turn cut timestamps into contiguous 1-based scenes covering `[0, duration]`.
fn scenes_from_cuts(cuts: &[f64], duration: f64) -> Vec<Scene> {
    let mut scenes = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0.0;

    for &cut in cuts {
        scenes.push(Scene {
            number: scenes.len() + 1,
            start_secs: start,
            end_secs: cut,
        });
        start = cut;
    }
    scenes.push(Scene {
        number: scenes.len() + 1,
        start_secs: start,
        end_secs: duration,
    });

    scenes
}

/// Extract (score, time) strings from one scdet stderr line.
/// Format: `[scdet @ 0x...] lavfi.scd.score: 1.234, lavfi.scd.time: 5.678`
fn parse_scdet_line(line: &str) -> Option<(&str, &str)> {
    let score_start = line.find("lavfi.scd.score: ")? + "lavfi.scd.score: ".len();
    let score_end = line[score_start..].find(',')?;
    let score_str = &line[score_start..score_start + score_end];

    let time_start = line.find("lavfi.scd.time: ")? + "lavfi.scd.time: ".len();
    let time_str = line[time_start..].split_whitespace().next()?;

    Some((score_str, time_str))
}
