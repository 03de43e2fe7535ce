//! Scripted in-memory inference client shared by the integration tests.
//!
//! Requests are routed by what the prompt asks for, so one client can
//! answer detection, the three ensemble variants, the judge and the
//! summary. Every request is recorded for later inspection.

#![allow(dead_code)]

use async_trait::async_trait;
use notescribe::client::{Choice, InferenceClient, InferenceRequest, InferenceResponse, TokenUsage};
use notescribe::{InferenceError, Variant};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness (`RUST_LOG=debug` to see them).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Detection,
    Transcription(Variant),
    Judge,
    Summary,
}

pub fn classify(request: &InferenceRequest) -> Call {
    let text = request.text();
    const SUMMARY_MARKERS: [&str; 4] = [
        "ZUSAMMENFASSUNG DER INSPEKTIONSNOTIZEN",
        "INSPECTION NOTES SUMMARY",
        "SYNTHÈSE DES NOTES D'INSPECTION",
        "SINTESI DELLE NOTE DI ISPEZIONE",
    ];
    if text.contains("=== TRANSCRIPTION 1") {
        Call::Judge
    } else if SUMMARY_MARKERS.iter().any(|m| text.starts_with(m)) {
        Call::Summary
    } else if text.contains("FOCUS: ACCURACY") {
        Call::Transcription(Variant::Accuracy)
    } else if text.contains("FOCUS: COMPLETENESS") {
        Call::Transcription(Variant::Completeness)
    } else if text.contains("FOCUS: STRUCTURE") {
        Call::Transcription(Variant::Structure)
    } else {
        Call::Detection
    }
}

/// Base64 payload of the first image in the request (the test photos are
/// bare strings such as `"PUMP"`), or an empty string.
pub fn image_payload(request: &InferenceRequest) -> String {
    request
        .messages
        .iter()
        .flat_map(|m| m.images())
        .next()
        .map(|img| img.data().to_string())
        .unwrap_or_default()
}

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// A response whose first choice has no message.
    Empty,
    Fail(InferenceError),
    /// Wait, then answer.
    After(Duration, Box<Reply>),
    /// Never answers.
    Hang,
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    pub fn service_error(status: u16, message: &str) -> Self {
        Reply::Fail(InferenceError::Service {
            status: Some(status),
            code: None,
            message: message.to_string(),
        })
    }
}

type Handler = dyn Fn(Call, &InferenceRequest) -> Reply + Send + Sync;

/// Default behaviour: English detected, each variant reads the payload,
/// the judge reports which payload it reconciled, the summary is fixed.
pub fn default_reply(call: Call, request: &InferenceRequest) -> Reply {
    let payload = image_payload(request);
    match call {
        Call::Detection => Reply::text("DOMINANT_LANGUAGE: english"),
        Call::Transcription(v) => Reply::text(format!("{} reading of {payload}", v.letter())),
        Call::Judge => Reply::text(format!("reconciled {payload}")),
        Call::Summary => Reply::text("Summary of the inspection."),
    }
}

pub struct ScriptedClient {
    handler: Box<Handler>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Self::with(default_reply)
    }

    /// Route through `handler`; it sees the classified call and the request.
    pub fn with<F>(handler: F) -> Arc<Self>
    where
        F: Fn(Call, &InferenceRequest) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.requests().iter().map(classify).collect()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }
}

fn respond(reply: Reply) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<InferenceResponse, InferenceError>> + Send>> {
    Box::pin(async move {
        match reply {
            Reply::Text(text) => Ok(InferenceResponse {
                choices: vec![Choice {
                    message: Some(text),
                }],
                usage: TokenUsage {
                    input_tokens: 100,
                    output_tokens: 10,
                },
            }),
            Reply::Empty => Ok(InferenceResponse {
                choices: vec![Choice { message: None }],
                usage: TokenUsage::default(),
            }),
            Reply::Fail(e) => Err(e),
            Reply::After(delay, next) => {
                tokio::time::sleep(delay).await;
                respond(*next).await
            }
            Reply::Hang => std::future::pending().await,
        }
    })
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        let reply = (self.handler)(classify(&request), &request);
        self.requests.lock().unwrap().push(request);
        respond(reply).await
    }
}
