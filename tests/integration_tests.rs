//! Integration tests for scenescribe
//!
//! Ledger/scanner tests run anywhere; the end-to-end pipeline tests generate
//! a tiny synthetic video with FFmpeg and are skipped when it is missing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use scenescribe::config::DetectorConfig;
use scenescribe::error::Result;
use scenescribe::ledger::{Ledger, SceneRecord, Schema, SplitRecord};
use scenescribe::pipeline::{run_split, run_transcribe, SplitOptions, TranscribeOptions};
use scenescribe::scan::{list_pending, ProcessedKey};
use scenescribe::transcribe::{text_or_sentinel, Transcriber, NO_TRANSCRIPTION};
use tempfile::tempdir;

fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Render a 2-second test video (color bars + sine tone) for pipeline tests.
fn make_test_video(path: &Path) -> bool {
    let status = Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i", "testsrc=duration=2:size=320x240:rate=10"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=2"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
        .arg(path)
        .status();
    matches!(status, Ok(s) if s.success()) && path.exists()
}

/// Transcriber stub that never leaves the process.
struct MockTranscriber {
    reply: String,
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        Ok(text_or_sentinel(&self.reply))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ============================================================================
// Scanner + Ledger Resumability Tests
// ============================================================================

mod resumability_tests {
    use super::*;

    #[test]
    fn test_scanner_uses_ledger_processed_set() {
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        for name in ["a.mp4", "b.mkv", "c.mov"] {
            std::fs::File::create(input.path().join(name)).unwrap();
        }
        std::fs::File::create(input.path().join("notes.txt")).unwrap();

        let ledger_path = out.path().join("scenes.csv");
        let mut ledger = Ledger::open(&ledger_path, Schema::Split).unwrap();
        ledger
            .append_video(
                "b",
                &[SplitRecord {
                    video_name: "b".to_string(),
                    scene_number: 1,
                    start_time: 0.0,
                    end_time: 5.0,
                }],
            )
            .unwrap();

        let pending =
            list_pending(input.path(), ledger.processed(), ProcessedKey::Stem).unwrap();
        assert_eq!(pending, vec!["a.mp4", "c.mov"]);

        // Reopening the ledger rebuilds the same gate
        let reopened = Ledger::open(&ledger_path, Schema::Split).unwrap();
        let pending =
            list_pending(input.path(), reopened.processed(), ProcessedKey::Stem).unwrap();
        assert_eq!(pending, vec!["a.mp4", "c.mov"]);
    }

    #[test]
    fn test_interrupted_video_is_retried() {
        // A crash before the per-video flush leaves no rows, so the video
        // stays in the pending list even if its artifacts exist on disk.
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::File::create(input.path().join("a.mp4")).unwrap();

        let ledger = Ledger::open(&out.path().join("scenes.csv"), Schema::Transcribe).unwrap();
        // Simulate leftover artifacts from the interrupted run
        std::fs::create_dir_all(out.path().join("videos/a/scenes")).unwrap();

        let pending =
            list_pending(input.path(), ledger.processed(), ProcessedKey::FileName).unwrap();
        assert_eq!(pending, vec!["a.mp4"]);
    }

    #[test]
    fn test_any_row_marks_video_processed() {
        // The transcribe gate treats "any row for this video" as processed;
        // the buffered per-video flush is what makes that sound.
        let out = tempdir().unwrap();
        let ledger_path = out.path().join("scenes.csv");

        let mut ledger = Ledger::open(&ledger_path, Schema::Transcribe).unwrap();
        let rows: Vec<SceneRecord> = (1..=3)
            .map(|n| SceneRecord {
                video: "a.mp4".to_string(),
                screen_nr: format!("{n:03}"),
                scene: format!("videos/a/scenes/{n:03}.mp4"),
                image: format!("videos/a/images/{n:03}.jpg"),
                start_time: n as f64,
                end_time: (n + 1) as f64,
                transcription: "text".to_string(),
            })
            .collect();
        ledger.append_video("a.mp4", &rows).unwrap();

        let reopened = Ledger::open(&ledger_path, Schema::Transcribe).unwrap();
        assert!(reopened.is_processed("a.mp4"));
        assert_eq!(reopened.processed().len(), 1);
    }

    #[test]
    fn test_corrupt_ledger_fails_loudly() {
        let out = tempdir().unwrap();
        let ledger_path = out.path().join("scenes.csv");
        std::fs::write(&ledger_path, "not,a,real,header\n1,2,3,4\n").unwrap();

        assert!(Ledger::open(&ledger_path, Schema::Split).is_err());
        assert!(Ledger::open(&ledger_path, Schema::Transcribe).is_err());
    }
}

// ============================================================================
// Sentinel Tests
// ============================================================================

mod sentinel_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_recognition_yields_sentinel() {
        let mock = MockTranscriber {
            reply: "   ".to_string(),
        };
        let text = mock.transcribe(Path::new("/tmp/any.mp3")).await.unwrap();
        assert_eq!(text, NO_TRANSCRIPTION);
    }

    #[tokio::test]
    async fn test_nonempty_recognition_passes_through() {
        let mock = MockTranscriber {
            reply: "hello scenes".to_string(),
        };
        let text = mock.transcribe(Path::new("/tmp/any.mp3")).await.unwrap();
        assert_eq!(text, "hello scenes");
    }
}

// ============================================================================
// End-to-End Pipeline Tests (require FFmpeg)
// ============================================================================

mod e2e_tests {
    use super::*;

    fn split_opts(input: PathBuf, output: PathBuf) -> SplitOptions {
        SplitOptions {
            input,
            output,
            detector: DetectorConfig::default(),
            show_progress: false,
        }
    }

    #[test]
    fn test_split_end_to_end_and_idempotent() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        if !make_test_video(&input.path().join("a.mp4")) {
            eprintln!("Skipping test: could not render test video");
            return;
        }
        std::fs::write(input.path().join("notes.txt"), "not a video").unwrap();

        let opts = split_opts(input.path().to_path_buf(), output.path().to_path_buf());
        let stats = run_split(&opts).unwrap();
        assert_eq!(stats.videos_processed, 1);
        assert!(stats.scenes_written >= 1);

        // A solid synthetic clip has no cuts: one scene spanning the file
        assert!(output.path().join("videos/a-Scene-1.mp4").exists());
        assert!(output.path().join("images/a-Scene-1-1.jpg").exists());

        let ledger_path = output.path().join("scenes.csv");
        let mut reader = csv::Reader::from_path(&ledger_path).unwrap();
        let rows: Vec<SplitRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), stats.scenes_written);
        assert!(rows.iter().all(|r| r.video_name == "a"));
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.scene_number, i + 1);
            assert!(row.end_time > row.start_time);
        }

        // Second run is a no-op for the logged video
        let stats2 = run_split(&opts).unwrap();
        assert_eq!(stats2.videos_processed, 0);
        assert_eq!(stats2.videos_skipped, 1);

        let mut reader = csv::Reader::from_path(&ledger_path).unwrap();
        let rows2: Vec<SplitRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), rows2.len());
    }

    #[tokio::test]
    async fn test_transcribe_end_to_end_and_idempotent() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        if !make_test_video(&input.path().join("a.mp4")) {
            eprintln!("Skipping test: could not render test video");
            return;
        }

        let opts = TranscribeOptions {
            input: input.path().to_path_buf(),
            output: output.path().to_path_buf(),
            detector: DetectorConfig::default(),
            show_progress: false,
        };
        let mock = MockTranscriber {
            reply: String::new(),
        };

        let stats = run_transcribe(&opts, &mock).await.unwrap();
        assert_eq!(stats.videos_processed, 1);
        assert!(stats.scenes_written >= 1);

        assert!(output.path().join("videos/a/scenes/001.mp4").exists());
        assert!(output.path().join("videos/a/images/001.jpg").exists());
        assert!(output.path().join("videos/a/audio/001.mp3").exists());

        let ledger_path = output.path().join("scenes.csv");
        let mut reader = csv::Reader::from_path(&ledger_path).unwrap();
        let rows: Vec<SceneRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), stats.scenes_written);
        assert!(rows.iter().all(|r| r.video == "a.mp4"));
        // Empty model output lands as the sentinel, not an empty field
        assert!(rows.iter().all(|r| r.transcription == NO_TRANSCRIPTION));

        // Second run in succession: exactly one set of rows per video
        let stats2 = run_transcribe(&opts, &mock).await.unwrap();
        assert_eq!(stats2.videos_processed, 0);
        assert_eq!(stats2.videos_skipped, 1);

        let mut reader = csv::Reader::from_path(&ledger_path).unwrap();
        let rows2: Vec<SceneRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), rows2.len());
    }

    #[test]
    fn test_split_missing_input_dir_fails() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let output = tempdir().unwrap();
        let opts = split_opts(
            PathBuf::from("/nonexistent/input"),
            output.path().to_path_buf(),
        );
        assert!(run_split(&opts).is_err());
    }
}

// ============================================================================
// Scanner Edge Cases
// ============================================================================

mod scanner_tests {
    use super::*;

    #[test]
    fn test_uppercase_extensions_are_scanned() {
        let input = tempdir().unwrap();
        std::fs::File::create(input.path().join("CLIP.MP4")).unwrap();

        let pending =
            list_pending(input.path(), &HashSet::new(), ProcessedKey::FileName).unwrap();
        assert_eq!(pending, vec!["CLIP.MP4"]);
    }

    #[test]
    fn test_each_pending_video_listed_exactly_once() {
        let input = tempdir().unwrap();
        for name in ["x.mp4", "y.avi", "z.mkv"] {
            std::fs::File::create(input.path().join(name)).unwrap();
        }

        let pending = list_pending(input.path(), &HashSet::new(), ProcessedKey::Stem).unwrap();
        let unique: HashSet<_> = pending.iter().collect();
        assert_eq!(pending.len(), 3);
        assert_eq!(unique.len(), 3);
    }
}
