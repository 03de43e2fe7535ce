//! Integration tests for the extraction pipeline and the summarizer.
//!
//! Every test runs against [`common::ScriptedClient`]; no network access.

mod common;

use common::{default_reply, image_payload, Call, Reply, ScriptedClient};
use futures::StreamExt;
use notescribe::prompts::judge_prompt;
use notescribe::{
    Batch, CancellationToken, DetectedLanguage, Digitizer, DigitizerConfig,
    ExtractionProgressCallback, ItemKind, Language, NotesError, ResultSet, ResultStatus, Stage,
    Variant,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn digitizer(client: &Arc<ScriptedClient>) -> Digitizer {
    common::init_tracing();
    Digitizer::with_client(client.clone(), DigitizerConfig::default())
}

fn digitizer_with(client: &Arc<ScriptedClient>, config: DigitizerConfig) -> Digitizer {
    common::init_tracing();
    Digitizer::with_client(client.clone(), config)
}

// ── Batch-level behaviour ────────────────────────────────────────────────────

#[tokio::test]
async fn every_item_yields_one_result_even_when_all_images_fail() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Transcription(_) => Reply::service_error(500, "model overloaded"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new()
        .image_encoded("ONE", "one.jpg")
        .text("first typed note")
        .image_encoded("TWO", "two.jpg")
        .image_encoded("THREE", "three.jpg")
        .text("second typed note");

    let results = digitizer(&client).extract(batch.items()).await.expect("run succeeds");

    assert_eq!(results.len(), 5);
    let mut ids: Vec<_> = results.results().iter().map(|r| r.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5, "ids must be unique");

    let stats = results.stats();
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.succeeded, 2);
    for r in results.results().iter().filter(|r| r.kind == ItemKind::Image) {
        assert_eq!(r.status, ResultStatus::Failed);
        assert!(r.content.starts_with("Transcription failed:"), "got: {}", r.content);
        assert!(r.content.contains("Service error"), "got: {}", r.content);
    }
}

#[tokio::test]
async fn empty_batch_is_rejected_without_calls() {
    let client = ScriptedClient::new();
    let err = digitizer(&client).extract(&[]).await.unwrap_err();
    assert!(matches!(err, NotesError::EmptyBatch));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let client = ScriptedClient::new();
    let mut items = Batch::new()
        .image_encoded("A", "a.jpg")
        .image_encoded("B", "b.jpg")
        .into_items();
    if let notescribe::InputItem::Image(img) = &mut items[1] {
        img.id = "image-001".into();
    }
    let err = digitizer(&client).extract(&items).await.unwrap_err();
    assert!(matches!(err, NotesError::DuplicateItemId { ref id } if id == "image-001"));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn missing_credential_fails_before_any_call() {
    let err = Digitizer::new(DigitizerConfig::default()).unwrap_err();
    assert!(matches!(err, NotesError::Configuration { .. }));
}

#[tokio::test]
async fn prebuilt_client_in_config_is_used() {
    let client = ScriptedClient::new();
    let config = DigitizerConfig::builder()
        .client(client.clone())
        .build()
        .unwrap();
    let digitizer = Digitizer::new(config).expect("client supplied");
    assert_eq!(digitizer.client().name(), "scripted");
}

#[tokio::test]
async fn text_results_come_first_then_images_in_submission_order() {
    // The first image is the slowest to reconcile.
    let client = ScriptedClient::with(|call, req| {
        let reply = default_reply(call, req);
        if call == Call::Judge && image_payload(req) == "SLOW" {
            Reply::After(Duration::from_millis(60), Box::new(reply))
        } else {
            reply
        }
    });
    let batch = Batch::new()
        .image_encoded("SLOW", "slow.jpg")
        .text("note one")
        .image_encoded("FAST", "fast.jpg")
        .text("note two");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let order: Vec<_> = results.results().iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(
        order,
        vec!["digital_notes_01.txt", "digital_notes_02.txt", "slow.jpg", "fast.jpg"]
    );
    assert_eq!(results.results()[2].content, "reconciled SLOW");
    assert_eq!(results.results()[3].content, "reconciled FAST");
}

#[tokio::test]
async fn concurrency_limit_of_one_still_processes_everything() {
    let client = ScriptedClient::new();
    let config = DigitizerConfig::builder().concurrency(1).build().unwrap();
    let batch = Batch::new()
        .image_encoded("P1", "p1.jpg")
        .image_encoded("P2", "p2.jpg")
        .image_encoded("P3", "p3.jpg");

    let results = digitizer_with(&client, config)
        .extract(batch.items())
        .await
        .unwrap();
    assert_eq!(results.stats().succeeded, 3);
    // detection + three variants + judge, per image
    assert_eq!(client.requests().len(), 15);
}

#[test]
fn extract_sync_runs_without_an_outer_runtime() {
    let client = ScriptedClient::new();
    let batch = Batch::new().text("typed").image_encoded("P1", "p1.jpg");
    let results = digitizer(&client).extract_sync(batch.items()).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.results()[1].content, "reconciled P1");
}

// ── Per-image stages ─────────────────────────────────────────────────────────

#[tokio::test]
async fn image_runs_detect_ensemble_judge() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Detection => Reply::text("DOMINANT_LANGUAGE: German"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let r = &results.results()[0];

    assert_eq!(r.status, ResultStatus::Ok);
    assert_eq!(r.content, "reconciled PUMP");
    assert_eq!(r.detected_language, Some(DetectedLanguage::German));
    assert_eq!(r.original.as_deref(), Some("[image: pump.jpg]"));
    assert_eq!(r.usage.input_tokens, 500);
    assert_eq!(r.usage.output_tokens, 50);

    assert_eq!(client.count(Call::Detection), 1);
    for v in Variant::ALL {
        assert_eq!(client.count(Call::Transcription(v)), 1);
    }
    assert_eq!(client.count(Call::Judge), 1);

    // Every model call carries the photo.
    for req in client.requests() {
        assert_eq!(req.image_count(), 1);
        assert_eq!(image_payload(&req), "PUMP");
    }

    // The detected language reaches the transcription prompts.
    let transcription = client
        .requests()
        .into_iter()
        .find(|r| common::classify(r) == Call::Transcription(Variant::Accuracy))
        .unwrap();
    assert!(transcription.text().contains("mainly in German"));
}

#[tokio::test]
async fn detection_failure_continues_with_unknown() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Detection => Reply::service_error(503, "unavailable"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let r = &results.results()[0];

    assert_eq!(r.status, ResultStatus::Ok);
    assert_eq!(r.content, "reconciled PUMP");
    assert_eq!(r.detected_language, Some(DetectedLanguage::Unknown));
    for req in client.requests() {
        if let Call::Transcription(_) = common::classify(&req) {
            assert!(req
                .text()
                .contains("may mix German, English, French and Italian"));
        }
    }
}

#[tokio::test]
async fn unparseable_detection_reply_continues_with_unknown() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Detection => Reply::text("The notes look like Spanish to me."),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    assert_eq!(results.results()[0].status, ResultStatus::Ok);
    assert_eq!(
        results.results()[0].detected_language,
        Some(DetectedLanguage::Unknown)
    );
}

#[tokio::test]
async fn one_failed_variant_skips_the_judge() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Transcription(Variant::Completeness) => Reply::service_error(400, "bad image"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let r = &results.results()[0];

    assert_eq!(r.status, ResultStatus::Failed);
    assert!(r.content.starts_with("Transcription failed:"), "got: {}", r.content);
    assert!(r.content.contains("bad image"));
    assert_eq!(client.count(Call::Judge), 0);
}

#[tokio::test]
async fn empty_variant_reply_fails_the_ensemble() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Transcription(Variant::Structure) => Reply::Empty,
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    assert!(results.results()[0]
        .content
        .starts_with("Transcription failed:"));
    assert_eq!(client.count(Call::Judge), 0);
}

#[tokio::test]
async fn variant_reply_blank_after_cleanup_fails_the_ensemble() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Transcription(Variant::Completeness) => Reply::text("```\n\n```"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let r = &results.results()[0];
    assert_eq!(r.status, ResultStatus::Failed);
    assert!(r.content.starts_with("Transcription failed:"), "got: {}", r.content);
    assert!(r.content.contains("empty response"), "got: {}", r.content);
    assert_eq!(client.count(Call::Judge), 0);
}

#[tokio::test]
async fn judge_receives_all_three_transcriptions() {
    let client = ScriptedClient::new();
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");
    digitizer(&client).extract(batch.items()).await.unwrap();

    let judge = client
        .requests()
        .into_iter()
        .find(|r| common::classify(r) == Call::Judge)
        .expect("judge was called");
    let text = judge.text();
    for expected in ["A reading of PUMP", "B reading of PUMP", "C reading of PUMP"] {
        assert!(text.contains(expected), "judge prompt lacks {expected:?}");
    }
}

#[test]
fn judge_prompt_keeps_transcriptions_verbatim_in_any_order() {
    let a = (Variant::Accuracy, "Ventil[3/8] undicht");
    let b = (Variant::Completeness, "Ventil 3 undicht, Pumpe 2 ok");
    let c = (Variant::Structure, "- Ventil 3:\n    undicht");
    let orders = [
        [a, b, c],
        [a, c, b],
        [b, a, c],
        [b, c, a],
        [c, a, b],
        [c, b, a],
    ];
    for order in orders {
        let prompt = judge_prompt(order, DetectedLanguage::German);
        for (_, text) in [a, b, c] {
            assert!(prompt.contains(text), "missing {text:?} in {order:?}");
        }
    }
}

#[tokio::test]
async fn judge_failure_is_prefixed() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Judge => Reply::service_error(429, "rate limited"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let r = &results.results()[0];
    assert_eq!(r.status, ResultStatus::Failed);
    assert!(r.content.starts_with("Judge step failed:"), "got: {}", r.content);
}

#[tokio::test]
async fn empty_judge_reply_is_a_judge_failure() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Judge => Reply::text("```\n\n```"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    assert!(results.results()[0]
        .content
        .starts_with("Judge step failed:"));
}

#[tokio::test]
async fn unreadable_image_fails_encoding_without_calls() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new();
    let batch = Batch::new()
        .image_path(dir.path().join("missing.jpg"))
        .image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let missing = results.get("image-001").unwrap();
    assert_eq!(missing.status, ResultStatus::Failed);
    assert!(missing.content.starts_with("Image encoding failed:"));
    assert!(missing.preview.as_deref().unwrap().ends_with("missing.jpg"));
    assert_eq!(results.get("image-002").unwrap().status, ResultStatus::Ok);
    // only the readable image reached the model
    assert_eq!(client.requests().len(), 5);
}

#[tokio::test]
async fn bracket_alternatives_pass_through_and_are_counted() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Judge => Reply::text("Leak at valve[3/8], check [pump, pipe, pipes]"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    let r = &results.results()[0];
    assert_eq!(r.content, "Leak at valve[3/8], check [pump, pipe, pipes]");
    assert_eq!(r.uncertain_spans(), 2);
    assert_eq!(results.stats().uncertain_spans, 2);
}

#[tokio::test]
async fn transient_failures_are_retried_when_enabled() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let client = ScriptedClient::with(move |call, req| match call {
        Call::Judge if seen.fetch_add(1, Ordering::SeqCst) == 0 => {
            Reply::service_error(503, "try again")
        }
        _ => default_reply(call, req),
    });
    let config = DigitizerConfig::builder()
        .max_retries(2)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");

    let results = digitizer_with(&client, config)
        .extract(batch.items())
        .await
        .unwrap();
    assert_eq!(results.results()[0].status, ResultStatus::Ok);
    assert_eq!(client.count(Call::Judge), 2);
}

// ── Scenario: typed note plus photo ──────────────────────────────────────────

#[tokio::test]
async fn typed_note_and_photo_with_failed_detection() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Detection => Reply::text("no idea"),
        _ => default_reply(call, req),
    });
    let batch = Batch::new()
        .text("Leak detected at valve 3")
        .image_encoded("PUMP", "IMG_0042.jpg");

    let results = digitizer(&client).extract(batch.items()).await.unwrap();
    assert_eq!(results.len(), 2);

    let text = &results.results()[0];
    assert_eq!(text.kind, ItemKind::Text);
    assert_eq!(text.content, "Leak detected at valve 3");
    assert_eq!(text.filename, "digital_notes_01.txt");

    let image = &results.results()[1];
    assert_eq!(image.kind, ItemKind::Image);
    assert_eq!(image.status, ResultStatus::Ok);
    assert_eq!(image.content, "reconciled PUMP");
}

// ── Cancellation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelling_marks_in_flight_images_cancelled() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Judge => Reply::Hang,
        _ => default_reply(call, req),
    });
    let batch = Batch::new()
        .text("typed")
        .image_encoded("P1", "p1.jpg")
        .image_encoded("P2", "p2.jpg");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let results = tokio::time::timeout(
        Duration::from_secs(5),
        digitizer(&client).extract_with_cancel(batch.items(), &cancel),
    )
    .await
    .expect("cancellation ends the run")
    .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results.results()[0].status, ResultStatus::Ok);
    for r in &results.results()[1..] {
        assert_eq!(r.status, ResultStatus::Cancelled);
        assert!(r.content.starts_with("Judge step failed:"), "got: {}", r.content);
    }
    assert_eq!(results.stats().cancelled, 2);
}

#[tokio::test]
async fn cancelled_before_start_makes_no_calls() {
    let client = ScriptedClient::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let batch = Batch::new().image_encoded("P1", "p1.jpg").text("typed");

    let results = digitizer(&client)
        .extract_with_cancel(batch.items(), &cancel)
        .await
        .unwrap();
    assert_eq!(results.get("image-001").unwrap().status, ResultStatus::Cancelled);
    assert_eq!(results.get("text-001").unwrap().status, ResultStatus::Ok);
    assert!(client.requests().is_empty());
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_texts_first_and_every_image() {
    let client = ScriptedClient::new();
    let batch = Batch::new()
        .image_encoded("P1", "p1.jpg")
        .text("typed")
        .image_encoded("P2", "p2.jpg");

    let stream = digitizer(&client)
        .extract_stream(batch.into_items(), CancellationToken::new())
        .unwrap();
    let results: Vec<_> = stream.collect().await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].kind, ItemKind::Text);
    let mut images: Vec<_> = results[1..].iter().map(|r| r.content.clone()).collect();
    images.sort();
    assert_eq!(images, vec!["reconciled P1", "reconciled P2"]);
}

#[tokio::test]
async fn stream_rejects_empty_batch() {
    let client = ScriptedClient::new();
    let err = digitizer(&client)
        .extract_stream(Vec::new(), CancellationToken::new())
        .err()
        .expect("empty batch");
    assert!(matches!(err, NotesError::EmptyBatch));
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    started: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
}

impl ExtractionProgressCallback for Recorder {
    fn on_extraction_start(&self, total_items: usize) {
        self.events.lock().unwrap().push(format!("start {total_items}"));
    }

    fn on_item_start(&self, _id: &str, _filename: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stage(&self, id: &str, stage: Stage) {
        self.events.lock().unwrap().push(format!("{id} {stage}"));
    }

    fn on_item_complete(&self, _id: &str, _filename: &str, _content_len: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_item_error(&self, _id: &str, _filename: &str, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_extraction_complete(&self, total_items: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total_items}"));
    }
}

#[tokio::test]
async fn progress_callback_sees_every_item() {
    let client = ScriptedClient::with(|call, req| {
        if call == Call::Judge && image_payload(req) == "BAD" {
            Reply::service_error(500, "boom")
        } else {
            default_reply(call, req)
        }
    });
    let recorder = Arc::new(Recorder::default());
    let config = DigitizerConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let batch = Batch::new()
        .text("typed")
        .image_encoded("GOOD", "good.jpg")
        .image_encoded("BAD", "bad.jpg");

    digitizer_with(&client, config)
        .extract(batch.items())
        .await
        .unwrap();

    assert_eq!(recorder.started.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.errors.load(Ordering::SeqCst), 1);
    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events.first().map(String::as_str), Some("start 3"));
    assert_eq!(events.last().map(String::as_str), Some("done 2/3"));
    assert!(events.contains(&"image-001 judge".to_string()));
    assert!(events.contains(&"image-002 language detection".to_string()));
}

#[tokio::test]
async fn text_items_are_reported_as_started_and_finished() {
    let client = ScriptedClient::new();
    let recorder = Arc::new(Recorder::default());
    let config = DigitizerConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let batch = Batch::new().text("first").text("second").image_encoded("P1", "p1.jpg");

    digitizer_with(&client, config)
        .extract(batch.items())
        .await
        .unwrap();

    assert_eq!(recorder.started.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn stream_reports_progress_like_extract() {
    let client = ScriptedClient::with(|call, req| {
        if call == Call::Judge && image_payload(req) == "BAD" {
            Reply::service_error(500, "boom")
        } else {
            default_reply(call, req)
        }
    });
    let recorder = Arc::new(Recorder::default());
    let config = DigitizerConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let batch = Batch::new()
        .text("typed")
        .image_encoded("GOOD", "good.jpg")
        .image_encoded("BAD", "bad.jpg");

    let results: Vec<_> = digitizer_with(&client, config)
        .extract_stream(batch.into_items(), CancellationToken::new())
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(recorder.started.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.errors.load(Ordering::SeqCst), 1);
    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events.first().map(String::as_str), Some("start 3"));
    assert_eq!(events.last().map(String::as_str), Some("done 2/3"));
}

// ── Summary ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_of_nothing_makes_no_call() {
    let client = ScriptedClient::new();
    let err = digitizer(&client)
        .summarize(&ResultSet::default(), "english")
        .await
        .unwrap_err();
    assert!(matches!(err, NotesError::EmptySummaryInput));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn german_summary_prompt_carries_both_results() {
    let client = ScriptedClient::new();
    let digitizer = digitizer(&client);
    let batch = Batch::new()
        .text("Leak detected at valve 3")
        .image_encoded("PUMP", "IMG_0042.jpg");
    let results = digitizer.extract(batch.items()).await.unwrap();

    let summary = digitizer.summarize(&results, "german").await.unwrap();
    assert_eq!(summary.text, "Summary of the inspection.");
    assert_eq!(summary.language, Language::German);
    assert_eq!(summary.item_count, 2);

    let request = client
        .requests()
        .into_iter()
        .find(|r| common::classify(r) == Call::Summary)
        .expect("summary was requested");
    let prompt = request.text();
    assert!(prompt.starts_with("ZUSAMMENFASSUNG DER INSPEKTIONSNOTIZEN"));
    assert!(prompt.contains("digital_notes_01.txt"));
    assert!(prompt.contains("IMG_0042.jpg"));
    assert!(prompt.contains("Leak detected at valve 3"));
    assert!(prompt.contains("reconciled PUMP"));
    assert_eq!(request.image_count(), 0);
}

#[tokio::test]
async fn unknown_summary_language_falls_back_to_english() {
    let client = ScriptedClient::new();
    let digitizer = digitizer(&client);
    let results = digitizer
        .extract(Batch::new().text("Pump 2 ok").items())
        .await
        .unwrap();

    let summary = digitizer.summarize(&results, "klingon").await.unwrap();
    assert_eq!(summary.language, Language::English);
    let prompt = client.requests()[0].text();
    assert!(prompt.starts_with("INSPECTION NOTES SUMMARY"));
}

#[tokio::test]
async fn summary_uses_edited_content_and_tracks_staleness() {
    let client = ScriptedClient::new();
    let digitizer = digitizer(&client);
    let batch = Batch::new().image_encoded("PUMP", "pump.jpg");
    let mut results = digitizer.extract(batch.items()).await.unwrap();

    let before = digitizer.summarize(&results, "english").await.unwrap();
    assert!(!before.is_stale(&results));

    results
        .edit_content("image-001", "Pump 2: pressure 4.2 bar, valve 3 replaced")
        .unwrap();
    assert!(before.is_stale(&results));

    let after = digitizer.summarize(&results, "english").await.unwrap();
    assert!(!after.is_stale(&results));

    let last = client.requests().pop().unwrap();
    let prompt = last.text();
    assert!(prompt.contains("Pump 2: pressure 4.2 bar, valve 3 replaced"));
    assert!(!prompt.contains("reconciled PUMP"));
}

#[tokio::test]
async fn summary_failure_is_not_retried() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Summary => Reply::service_error(503, "busy"),
        _ => default_reply(call, req),
    });
    let config = DigitizerConfig::builder()
        .max_retries(3)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let digitizer = digitizer_with(&client, config);
    let results = digitizer
        .extract(Batch::new().text("typed").items())
        .await
        .unwrap();

    let err = digitizer.summarize(&results, "french").await.unwrap_err();
    assert!(matches!(err, NotesError::Summary(_)));
    assert!(err.to_string().contains("busy"));
    assert_eq!(client.count(Call::Summary), 1);
}

#[tokio::test]
async fn empty_summary_reply_is_an_error() {
    let client = ScriptedClient::with(|call, req| match call {
        Call::Summary => Reply::Empty,
        _ => default_reply(call, req),
    });
    let digitizer = digitizer(&client);
    let results = digitizer
        .extract(Batch::new().text("typed").items())
        .await
        .unwrap();
    assert!(matches!(
        digitizer.summarize(&results, "italian").await,
        Err(NotesError::Summary(_))
    ));
}

#[tokio::test]
async fn edited_json_results_round_trip_into_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");

    let client = ScriptedClient::new();
    let digitizer = digitizer(&client);
    let batch = Batch::new()
        .image_encoded("PUMP", "pump.jpg")
        .text("Leak detected at valve 3");
    let results = digitizer.extract(batch.items()).await.unwrap();
    results.write_json(&path).await.unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let mut loaded = ResultSet::from_json(&json).unwrap();
    assert_eq!(loaded, results);
    loaded.edit_content("image-001", "Pump checked").unwrap();

    digitizer.summarize(&loaded, "english").await.unwrap();
    let prompt = client.requests().pop().unwrap().text();
    assert!(prompt.contains("Pump checked"));
}
