mod common;

use castup_client::{
    CancellationToken, EpisodeUploader, ProgressReporter, UploadError, UploadOptions,
};
use castup_core::{AudioSource, RetryPolicy};
use common::{CollectingReporter, EPISODE_ID, Outcome, RecordingApi, audio_bytes, draft};
use std::sync::Arc;
use std::time::Duration;

fn options(chunk_size: u64) -> UploadOptions {
    UploadOptions {
        chunk_size,
        request_overhead_bytes: 0,
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        },
        legacy_chunk_labels: true,
    }
}

fn assert_monotonic(percents: &[u8]) {
    for pair in percents.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {percents:?}");
    }
    assert!(percents.iter().all(|p| *p <= 100));
}

#[tokio::test]
async fn single_chunk_only_creates_episode() {
    let api = RecordingApi::new();
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));
    let reporter = CollectingReporter::new();

    let receipt = uploader
        .upload(&draft(audio_bytes(50)), reporter.clone(), &CancellationToken::new())
        .await
        .unwrap();

    let calls = api.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_create());
    assert_eq!((calls[0].sequence, calls[0].total), (1, 1));
    assert_eq!(calls[0].file_name, "pilot.mp3");
    assert_eq!(calls[0].content_type, "audio/mp3");
    assert_eq!(calls[0].data, audio_bytes(50));

    let metadata = calls[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.podcast_id, "pod-7");
    assert!(metadata.is_explicit);

    assert_eq!(receipt.episode_id.as_str(), EPISODE_ID);
    assert_eq!(receipt.chunks, 1);
    assert_eq!(receipt.bytes, 50);
    assert_eq!(reporter.percents().last(), Some(&100));
}

#[tokio::test]
async fn three_chunks_create_then_append_in_order() {
    let api = RecordingApi::new();
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));
    let reporter = CollectingReporter::new();
    let audio = audio_bytes(180);

    let receipt = uploader
        .upload(&draft(audio.clone()), reporter.clone(), &CancellationToken::new())
        .await
        .unwrap();

    let calls = api.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].is_create());
    assert!(calls[0].episode_id.is_none());
    for call in &calls[1..] {
        assert!(!call.is_create());
        assert_eq!(call.episode_id.as_deref(), Some(EPISODE_ID));
    }

    let sequences: Vec<u32> = calls.iter().map(|c| c.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    let sizes: Vec<usize> = calls.iter().map(|c| c.data.len()).collect();
    assert_eq!(sizes, vec![80, 80, 20]);
    assert_eq!(calls.iter().flat_map(|c| c.data.clone()).collect::<Vec<_>>(), audio);

    assert!(calls.iter().all(|c| c.upload_id == receipt.upload_id && c.total == 3));
    assert_eq!(
        calls[1].file_name,
        format!("{}<##>2/3", receipt.upload_id)
    );
    assert!(!api.overlapped());

    assert_eq!(receipt.chunks, 3);
    assert_eq!(receipt.bytes, 180);

    let percents = reporter.percents();
    assert_monotonic(&percents);
    assert_eq!(percents.last(), Some(&100));
    assert_eq!(percents.iter().filter(|p| **p == 100).count(), 1);
}

#[tokio::test]
async fn failure_halts_remaining_chunks() {
    let api = RecordingApi::scripted([
        Outcome::Accept,
        Outcome::Status(400, "Episode does not exist."),
    ]);
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));
    let reporter = CollectingReporter::new();

    let err = uploader
        .upload(&draft(audio_bytes(180)), reporter.clone(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(api.calls().len(), 2);
    assert_eq!(err.user_message(), "Episode does not exist.");
    match err {
        UploadError::Chunk {
            sequence,
            total,
            episode_id,
            ..
        } => {
            assert_eq!((sequence, total), (2, 3));
            assert_eq!(episode_id.as_deref(), Some(EPISODE_ID));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(reporter.percents().iter().all(|p| *p < 100));
}

#[tokio::test]
async fn first_chunk_failure_reports_no_episode() {
    let api = RecordingApi::scripted([Outcome::Status(404, "User does not exist.")]);
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));

    let err = uploader
        .upload(&draft(audio_bytes(180)), CollectingReporter::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(api.calls().len(), 1);
    assert!(matches!(
        err,
        UploadError::Chunk {
            sequence: 1,
            episode_id: None,
            ..
        }
    ));
    assert_eq!(err.user_message(), "User does not exist.");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let api = RecordingApi::scripted([
        Outcome::Status(503, "busy"),
        Outcome::Accept,
        Outcome::Transport,
    ]);
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));
    let reporter = CollectingReporter::new();

    let receipt = uploader
        .upload(&draft(audio_bytes(120)), reporter.clone(), &CancellationToken::new())
        .await
        .unwrap();

    let sequences: Vec<u32> = api.calls().iter().map(|c| c.sequence).collect();
    assert_eq!(sequences, vec![1, 1, 2, 2]);
    assert_eq!(receipt.chunks, 2);
    assert_eq!(receipt.bytes, 120);

    let percents = reporter.percents();
    assert_monotonic(&percents);
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn retries_are_bounded() {
    let api = RecordingApi::scripted([Outcome::Transport, Outcome::Transport, Outcome::Transport]);
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));

    let err = uploader
        .upload(&draft(audio_bytes(10)), CollectingReporter::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(api.calls().len(), 3);
    assert!(matches!(err.root(), UploadError::Transport(_)));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let api = RecordingApi::scripted([Outcome::Status(413, "Request too large.")]);
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));

    let err = uploader
        .upload(&draft(audio_bytes(10)), CollectingReporter::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(api.calls().len(), 1);
    assert_eq!(err.user_message(), "Request too large.");
}

#[tokio::test]
async fn validation_failures_send_nothing() {
    let api = RecordingApi::new();
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));

    let mut missing_cover = draft(audio_bytes(10));
    missing_cover.cover = None;
    let err = uploader
        .upload(&missing_cover, CollectingReporter::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Validation(_)));
    assert_eq!(
        err.user_message(),
        "Cover Image, Episode Name and Description Required."
    );

    let mut empty_audio = draft(Vec::new());
    empty_audio.audio = Some(AudioSource::from_bytes("pilot.mp3", Vec::new()));
    let err = uploader
        .upload(&empty_audio, CollectingReporter::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Audio file is empty.");

    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn cancelled_token_sends_nothing() {
    let api = RecordingApi::new();
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = uploader
        .upload(&draft(audio_bytes(180)), CollectingReporter::new(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UploadError::Cancelled {
            completed: 0,
            total: 3
        }
    ));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn cancel_aborts_in_flight_chunk() {
    let api = RecordingApi::scripted([Outcome::Accept, Outcome::Hang]);
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let reporter: Arc<dyn ProgressReporter> = Arc::new(move |update: castup_client::ProgressUpdate| {
        if update.chunk == 2 && update.in_flight_bytes > 0 {
            trigger.cancel();
        }
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        uploader.upload(&draft(audio_bytes(180)), reporter, &cancel),
    )
    .await
    .expect("cancellation should not hang")
    .unwrap_err();

    assert!(matches!(
        err,
        UploadError::Cancelled {
            completed: 1,
            total: 3
        }
    ));
    let sequences: Vec<u32> = api.calls().iter().map(|c| c.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);
}

#[tokio::test]
async fn plain_file_names_without_legacy_labels() {
    let api = RecordingApi::new();
    let mut opts = options(80);
    opts.legacy_chunk_labels = false;
    let uploader = EpisodeUploader::new(Arc::clone(&api), opts);

    uploader
        .upload(&draft(audio_bytes(180)), CollectingReporter::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(api.calls().iter().all(|c| c.file_name == "pilot.mp3"));
}

#[tokio::test]
async fn overhead_estimate_still_finishes_at_100() {
    let api = RecordingApi::new();
    let mut opts = options(80);
    opts.request_overhead_bytes = 1_000;
    let uploader = EpisodeUploader::new(Arc::clone(&api), opts);
    let reporter = CollectingReporter::new();

    uploader
        .upload(&draft(audio_bytes(180)), reporter.clone(), &CancellationToken::new())
        .await
        .unwrap();

    let updates = reporter.updates();
    assert_eq!(updates[0].total_bytes, 180 + 3 * 1_000);
    let percents = reporter.percents();
    assert_monotonic(&percents);
    assert!(percents[..percents.len() - 1].iter().all(|p| *p < 10));
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn cancel_during_backoff_stops_waiting() {
    let api = RecordingApi::scripted([Outcome::Transport]);
    let mut opts = options(80);
    opts.retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_secs(30),
        max_backoff: Duration::from_secs(30),
    };
    let uploader = EpisodeUploader::new(Arc::clone(&api), opts);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        uploader.upload(&draft(audio_bytes(180)), CollectingReporter::new(), &cancel),
    )
    .await
    .expect("cancellation should interrupt the backoff")
    .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        err,
        UploadError::Cancelled {
            completed: 0,
            total: 3
        }
    ));
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn failed_chunk_sends_final_update() {
    let api = RecordingApi::scripted([Outcome::Accept, Outcome::Status(400, "Bad chunk.")]);
    let uploader = EpisodeUploader::new(Arc::clone(&api), options(80));
    let reporter = CollectingReporter::new();

    uploader
        .upload(&draft(audio_bytes(180)), reporter.clone(), &CancellationToken::new())
        .await
        .unwrap_err();

    let last = *reporter.updates().last().unwrap();
    assert_eq!(last.chunk, 2);
    assert_eq!(last.total_chunks, 3);
    assert_eq!(last.uploaded_bytes, 80);
    assert_eq!(last.in_flight_bytes, 0);
    assert!(last.percent < 100);
}
