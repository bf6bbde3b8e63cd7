use recording_scribe::config::Config;
use recording_scribe::pipeline::{FileOutcome, OutputPaths, PipelineOptions, RecordingPipeline};
use std::path::Path;

fn offline_options() -> PipelineOptions {
    // No refinement and no summary means no chat API client is built, so
    // these tests exercise the file bookkeeping without any network or
    // external tools.
    PipelineOptions {
        no_refine: true,
        ..Default::default()
    }
}

async fn write_fixture(path: &Path, content: &str) {
    tokio::fs::write(path, content).await.unwrap();
}

#[tokio::test]
async fn existing_outputs_short_circuit_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let media = dir.path().join("standup.mov");
    write_fixture(&media, "fake video").await;

    let config = Config::default();
    let outputs = OutputPaths::derive(&media, &config.output);
    write_fixture(&outputs.clean_transcript, "already refined").await;

    let pipeline = RecordingPipeline::new(config, offline_options()).unwrap();
    let outcome = pipeline.process_file(&media).await.unwrap();

    assert_eq!(outcome, FileOutcome::SkippedExisting);
    // Nothing else was produced
    assert!(!outputs.raw_transcript.exists());
    assert!(!outputs.srt.exists());
}

#[tokio::test]
async fn cached_raw_transcript_feeds_refinement_and_srt() {
    let dir = tempfile::tempdir().unwrap();
    let media = dir.path().join("retro.mov");
    write_fixture(&media, "fake video").await;

    let raw = "Speaker 00: [0.50-2.00] let's start the retro\n\
               Speaker 01: [2.50-4.00] sounds good";

    let config = Config::default();
    let outputs = OutputPaths::derive(&media, &config.output);
    write_fixture(&outputs.raw_transcript, raw).await;

    let pipeline = RecordingPipeline::new(config, offline_options()).unwrap();
    let outcome = pipeline.process_file(&media).await.unwrap();

    assert_eq!(outcome, FileOutcome::Completed);

    // --no-refine copies the raw transcript to the refined path
    let clean = tokio::fs::read_to_string(&outputs.clean_transcript)
        .await
        .unwrap();
    assert_eq!(clean, raw);

    let srt = tokio::fs::read_to_string(&outputs.srt).await.unwrap();
    assert!(srt.starts_with("1\n00:00:00,500 --> 00:00:02,000\n"));
    assert!(srt.contains("Speaker 01: sounds good"));
}

#[tokio::test]
async fn force_overwrites_stale_outputs_from_cached_raw() {
    let dir = tempfile::tempdir().unwrap();
    let media = dir.path().join("sync.mov");
    write_fixture(&media, "fake video").await;

    let raw = "Speaker 00: [0.00-1.00] new content";

    let config = Config::default();
    let outputs = OutputPaths::derive(&media, &config.output);
    write_fixture(&outputs.raw_transcript, raw).await;
    write_fixture(&outputs.clean_transcript, "stale refined output").await;

    let mut options = offline_options();
    options.force = true;

    let pipeline = RecordingPipeline::new(config, options).unwrap();
    let outcome = pipeline.process_file(&media).await.unwrap();

    assert_eq!(outcome, FileOutcome::Completed);
    let clean = tokio::fs::read_to_string(&outputs.clean_transcript)
        .await
        .unwrap();
    assert_eq!(clean, raw);
}

#[tokio::test]
async fn batch_reports_skips_and_continues_past_completed_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();

    for name in ["a.mov", "b.mov"] {
        let media = dir.path().join(name);
        write_fixture(&media, "fake video").await;
        let outputs = OutputPaths::derive(&media, &config.output);
        write_fixture(&outputs.clean_transcript, "done").await;
    }
    // One file with only a raw transcript still gets processed
    let pending = dir.path().join("c.mov");
    write_fixture(&pending, "fake video").await;
    let pending_outputs = OutputPaths::derive(&pending, &config.output);
    write_fixture(&pending_outputs.raw_transcript, "Speaker 00: [0.00-1.00] hi").await;

    let pipeline = RecordingPipeline::new(config, offline_options()).unwrap();
    let report = pipeline.process_directory(dir.path()).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 0);
    assert!(pending_outputs.clean_transcript.exists());
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let config = Config::default();
    let pipeline = RecordingPipeline::new(config, offline_options()).unwrap();
    let result = pipeline.process_file(Path::new("/no/such/recording.mov")).await;
    assert!(result.is_err());
}
