use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::DetectorConfig;
use crate::detect::{self, Scene};
use crate::error::Result;
use crate::extract;
use crate::ledger::{Ledger, SceneRecord, Schema, SplitRecord};
use crate::scan::{self, ProcessedKey};
use crate::transcribe::Transcriber;

/// Options for the split pipeline.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub detector: DetectorConfig,
    pub show_progress: bool,
}

/// Options for the transcribe pipeline.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub detector: DetectorConfig,
    pub show_progress: bool,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Videos processed and logged this run.
    pub videos_processed: usize,
    /// Videos skipped because the ledger already had them.
    pub videos_skipped: usize,
    /// Scenes materialized this run.
    pub scenes_written: usize,
    /// Wall-clock time for the whole run.
    pub total_time: Duration,
}

fn video_progress(show: bool, total: u64) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.green} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    Some(pb)
}

/// Split every pending video in the input folder into per-scene clips and
/// thumbnails, appending one ledger row per scene.
///
/// Artifacts land in shared `videos/` and `images/` directories under the
/// output folder, named `<stem>-Scene-<N>.mp4` and `<stem>-Scene-<N>-1.jpg`.
/// A video's rows are flushed only after all of its scenes exist on disk, so
/// an interrupted run never marks a half-finished video as done.
pub fn run_split(opts: &SplitOptions) -> Result<PipelineStats> {
    let start_time = Instant::now();

    extract::check_ffmpeg()?;
    extract::check_ffprobe()?;

    let images_dir = opts.output.join("images");
    let videos_dir = opts.output.join("videos");
    std::fs::create_dir_all(&images_dir)?;
    std::fs::create_dir_all(&videos_dir)?;

    let mut ledger = Ledger::open(&opts.output.join("scenes.csv"), Schema::Split)?;
    let candidates = scan::count_videos(&opts.input)?;
    let pending = scan::list_pending(&opts.input, ledger.processed(), ProcessedKey::Stem)?;
    scan::ensure_unique_stems(&pending)?;
    let skipped = candidates.saturating_sub(pending.len());

    info!("Found {} pending videos in {}", pending.len(), opts.input.display());

    let pb = video_progress(opts.show_progress, pending.len() as u64);
    let mut stats = PipelineStats {
        videos_skipped: skipped,
        ..Default::default()
    };

    for file_name in &pending {
        if let Some(pb) = &pb {
            pb.set_message(file_name.clone());
        }
        info!("Splitting {}...", file_name);

        let video_path = opts.input.join(file_name);
        let stem = ProcessedKey::Stem.of(file_name);
        let scenes = detect::detect_scenes(&video_path, &opts.detector)?;
        info!("\tdetected {} scenes", scenes.len());

        let mut rows = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            let image_path = images_dir.join(format!("{stem}-Scene-{}-1.jpg", scene.number));
            extract::extract_thumbnail(&video_path, &image_path, scene.midpoint_secs())?;

            let clip_path = videos_dir.join(format!("{stem}-Scene-{}.mp4", scene.number));
            extract::extract_clip(&video_path, &clip_path, scene.start_secs, scene.end_secs)?;

            rows.push(SplitRecord {
                video_name: stem.clone(),
                scene_number: scene.number,
                start_time: scene.start_secs,
                end_time: scene.end_secs,
            });
        }

        ledger.append_video(&stem, &rows)?;
        stats.videos_processed += 1;
        stats.scenes_written += rows.len();
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    stats.total_time = start_time.elapsed();
    Ok(stats)
}

/// Per-video output directories for the transcribe pipeline.
struct SceneDirs {
    scenes: PathBuf,
    images: PathBuf,
    audio: PathBuf,
}

/// Create a clean `videos/<stem>/{scenes,images,audio}` tree.
///
/// An existing tree for the video is deleted first: if we got here, the
/// video is not in the ledger, so whatever is on disk is a leftover from an
/// interrupted run and must be rebuilt from scratch.
fn prepare_scene_dirs(output: &Path, stem: &str) -> Result<SceneDirs> {
    let video_dir = output.join("videos").join(stem);
    if video_dir.exists() {
        warn!("Removing leftover output for {}", stem);
        std::fs::remove_dir_all(&video_dir)?;
    }
    let dirs = SceneDirs {
        scenes: video_dir.join("scenes"),
        images: video_dir.join("images"),
        audio: video_dir.join("audio"),
    };
    std::fs::create_dir_all(&dirs.scenes)?;
    std::fs::create_dir_all(&dirs.images)?;
    std::fs::create_dir_all(&dirs.audio)?;
    Ok(dirs)
}

/// Materialize one scene's clip, thumbnail, and audio, then transcribe it.
async fn process_scene(
    video_path: &Path,
    file_name: &str,
    ext: &str,
    scene: &Scene,
    dirs: &SceneDirs,
    transcriber: &dyn Transcriber,
) -> Result<SceneRecord> {
    let scene_nr = format!("{:03}", scene.number);
    let clip_path = dirs.scenes.join(format!("{scene_nr}.{ext}"));
    let image_path = dirs.images.join(format!("{scene_nr}.jpg"));
    let audio_path = dirs.audio.join(format!("{scene_nr}.mp3"));

    extract::extract_clip(video_path, &clip_path, scene.start_secs, scene.end_secs)?;
    extract::extract_thumbnail(video_path, &image_path, scene.midpoint_secs())?;
    extract::extract_audio(&clip_path, &audio_path)?;

    let transcription = transcriber.transcribe(&audio_path).await?;

    Ok(SceneRecord {
        video: file_name.to_string(),
        screen_nr: scene_nr,
        scene: clip_path.display().to_string(),
        image: image_path.display().to_string(),
        start_time: scene.start_secs,
        end_time: scene.end_secs,
        transcription,
    })
}

/// Split every pending video into scenes and transcribe each scene's audio.
///
/// Artifacts land in a per-video `videos/<stem>/{scenes,images,audio}` tree
/// with zero-padded scene numbers. Rows are buffered in memory and flushed
/// per video after the last scene is transcribed; a crash mid-video leaves
/// the ledger untouched and the video is redone wholesale on the next run.
pub async fn run_transcribe(
    opts: &TranscribeOptions,
    transcriber: &dyn Transcriber,
) -> Result<PipelineStats> {
    let start_time = Instant::now();

    extract::check_ffmpeg()?;
    extract::check_ffprobe()?;

    std::fs::create_dir_all(opts.output.join("videos"))?;
    let mut ledger = Ledger::open(&opts.output.join("scenes.csv"), Schema::Transcribe)?;
    let candidates = scan::count_videos(&opts.input)?;
    let pending = scan::list_pending(&opts.input, ledger.processed(), ProcessedKey::FileName)?;
    scan::ensure_unique_stems(&pending)?;
    let skipped = candidates.saturating_sub(pending.len());

    info!("Transcribing {} files with {}", pending.len(), transcriber.name());

    let pb = video_progress(opts.show_progress, pending.len() as u64);
    let mut stats = PipelineStats {
        videos_skipped: skipped,
        ..Default::default()
    };

    for file_name in &pending {
        if let Some(pb) = &pb {
            pb.set_message(file_name.clone());
        }
        info!("- {}", file_name);

        let video_path = opts.input.join(file_name);
        let stem = ProcessedKey::Stem.of(file_name);
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4")
            .to_string();

        let scenes = detect::detect_scenes(&video_path, &opts.detector)?;
        let dirs = prepare_scene_dirs(&opts.output, &stem)?;

        // Rows stay in memory until the whole video is done: one scene row
        // in the ledger would make the resumability gate skip the video.
        let mut rows = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            let row =
                process_scene(&video_path, file_name, &ext, scene, &dirs, transcriber).await?;
            rows.push(row);
        }

        ledger.append_video(file_name, &rows)?;
        stats.videos_processed += 1;
        stats.scenes_written += rows.len();
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    stats.total_time = start_time.elapsed();
    Ok(stats)
}

/// Print a summary of the run.
pub fn print_summary(stats: &PipelineStats, ledger_path: &Path) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                         Run Complete                           ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Videos processed:  {}", stats.videos_processed);
    println!("  Videos skipped:    {} (already in ledger)", stats.videos_skipped);
    println!("  Scenes written:    {}", stats.scenes_written);
    println!("  Ledger:            {}", ledger_path.display());
    println!("  Elapsed:           {:.2}s", stats.total_time.as_secs_f64());
    println!();
}
