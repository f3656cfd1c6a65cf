//! Shared fixtures: a scripted generation capability, fake conversion engines
//! and a sample payload.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use property_stock_report::agents::{
    AgentProfile, CapabilityFactory, CapabilityProvider, GenerationCapability, GenerationError,
    RunHandle, RunState, RunStatus,
};
use property_stock_report::report::{ConversionError, DocxConverter, PdfRenderer};
use property_stock_report::{AppConfig, AppState};

pub const ENGLISH_TEXT: &str = "Q1 Stock\nPeriod: Jan-Mar 2025\nExecutive Summary\nSelangor holds 1,200 existing residential units.";
pub const MALAY_TEXT: &str = "Q1 Stock\nTempoh: Jan-Mac 2025\nRingkasan Eksekutif\nSelangor mempunyai 1,200 unit kediaman sedia ada.";
pub const HTML_BODY: &str = "<!doctype html>\n<html><head><style>.page-break { page-break-before: always; }</style></head><body><h1>Q1 Stock</h1><div class=\"page-break\"></div><img class=\"chart\" src=\"charts/residential_existing_by_state.svg\"></body></html>";

/// The HTML maker's raw reply, fenced the way models tend to answer.
pub fn fenced_html() -> String {
    format!("```html\n{}\n```", HTML_BODY)
}

/// Generation capability that answers from a script.
pub struct ScriptedCapability {
    replies: HashMap<&'static str, String>,
    polls_before_done: usize,
    never_finishes: bool,
    failing_agent: Option<(&'static str, RunStatus, String)>,
    thread_failures: AtomicUsize,
    auth_failures: AtomicUsize,
    lost_run_responses: AtomicUsize,
    reject_threads: bool,
    thread_attempts: AtomicUsize,
    threads: Mutex<Vec<Value>>,
    /// run id to (agent, polls so far, thread id)
    runs: Mutex<HashMap<String, (&'static str, usize, String)>>,
    submissions: Mutex<Vec<(String, Value)>>,
}

impl ScriptedCapability {
    pub fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert("eng-report-agent", ENGLISH_TEXT.to_string());
        replies.insert("malay-report-agent", MALAY_TEXT.to_string());
        replies.insert("html-maker-agent", fenced_html());
        Self {
            replies,
            polls_before_done: 1,
            never_finishes: false,
            failing_agent: None,
            thread_failures: AtomicUsize::new(0),
            auth_failures: AtomicUsize::new(0),
            lost_run_responses: AtomicUsize::new(0),
            reject_threads: false,
            thread_attempts: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
            runs: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, agent: &'static str, text: &str) -> Self {
        self.replies.insert(agent, text.to_string());
        self
    }

    pub fn polls_before_done(mut self, polls: usize) -> Self {
        self.polls_before_done = polls;
        self
    }

    pub fn never_finishes(mut self) -> Self {
        self.never_finishes = true;
        self
    }

    pub fn fail_agent(mut self, agent: &'static str, status: RunStatus, message: &str) -> Self {
        self.failing_agent = Some((agent, status, message.to_string()));
        self
    }

    /// The first `count` thread creations fail with a transient error.
    pub fn flaky_submits(self, count: usize) -> Self {
        self.thread_failures.store(count, Ordering::SeqCst);
        self
    }

    /// The first `count` thread creations are refused with a 401.
    pub fn auth_failures(self, count: usize) -> Self {
        self.auth_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Every thread creation answers 400, as for a malformed request.
    pub fn reject_threads(mut self) -> Self {
        self.reject_threads = true;
        self
    }

    /// The first `count` runs are created but their response never arrives.
    pub fn lose_run_responses(self, count: usize) -> Self {
        self.lost_run_responses.store(count, Ordering::SeqCst);
        self
    }

    /// `(agent name, message JSON)` for every run created, in order.
    pub fn submissions(&self) -> Vec<(String, Value)> {
        self.submissions.lock().clone()
    }

    pub fn thread_attempts(&self) -> usize {
        self.thread_attempts.load(Ordering::SeqCst)
    }

    pub fn threads_created(&self) -> usize {
        self.threads.lock().len()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl GenerationCapability for ScriptedCapability {
    async fn create_thread(&self, message: &str) -> Result<String, GenerationError> {
        self.thread_attempts.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.thread_failures) {
            return Err(GenerationError::Submit("connection reset".to_string()));
        }
        if take_one(&self.auth_failures) {
            return Err(GenerationError::Unauthorized(
                "create thread returned 401 Unauthorized".to_string(),
            ));
        }
        if self.reject_threads {
            return Err(GenerationError::Rejected(
                "create thread returned 400 Bad Request".to_string(),
            ));
        }

        let body: Value = serde_json::from_str(message).unwrap_or(Value::Null);
        let mut threads = self.threads.lock();
        threads.push(body);
        Ok(format!("thread_{}", threads.len()))
    }

    async fn start_run(&self, profile: &AgentProfile, thread_id: &str) -> Result<RunHandle, GenerationError> {
        let agent = self
            .replies
            .keys()
            .copied()
            .find(|name| *name == profile.name)
            .unwrap_or("unknown-agent");
        let index: usize = thread_id
            .trim_start_matches("thread_")
            .parse()
            .map_err(|_| GenerationError::Rejected(format!("unknown thread {}", thread_id)))?;
        let body = self
            .threads
            .lock()
            .get(index - 1)
            .cloned()
            .ok_or_else(|| GenerationError::Rejected(format!("unknown thread {}", thread_id)))?;

        let mut submissions = self.submissions.lock();
        submissions.push((profile.name.to_string(), body));
        let run_id = format!("run_{}", submissions.len());
        self.runs
            .lock()
            .insert(run_id.clone(), (agent, 0, thread_id.to_string()));

        if take_one(&self.lost_run_responses) {
            return Err(GenerationError::Submit(
                "create run request failed: connection closed".to_string(),
            ));
        }
        Ok(RunHandle {
            thread_id: thread_id.to_string(),
            run_id,
        })
    }

    async fn find_run(&self, thread_id: &str) -> Result<Option<RunHandle>, GenerationError> {
        let runs = self.runs.lock();
        let mut on_thread: Vec<&String> = runs
            .iter()
            .filter(|(_, (_, _, thread))| thread == thread_id)
            .map(|(run_id, _)| run_id)
            .collect();
        on_thread.sort();
        Ok(on_thread.last().map(|run_id| RunHandle {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
        }))
    }

    async fn poll_status(&self, run: &RunHandle) -> Result<RunState, GenerationError> {
        let mut runs = self.runs.lock();
        let entry = runs
            .get_mut(&run.run_id)
            .ok_or_else(|| GenerationError::Poll(format!("unknown run {}", run.run_id)))?;
        entry.1 += 1;

        if self.never_finishes || entry.1 <= self.polls_before_done {
            return Ok(RunState::new(RunStatus::InProgress));
        }
        if let Some((agent, status, message)) = &self.failing_agent {
            if *agent == entry.0 {
                return Ok(RunState {
                    status: status.clone(),
                    last_error: Some(message.clone()),
                });
            }
        }
        Ok(RunState::new(RunStatus::Completed))
    }

    async fn fetch_result(&self, run: &RunHandle) -> Result<String, GenerationError> {
        let agent = self
            .runs
            .lock()
            .get(&run.run_id)
            .map(|(agent, _, _)| *agent)
            .ok_or_else(|| GenerationError::Fetch(format!("unknown run {}", run.run_id)))?;
        Ok(self.replies.get(agent).cloned().unwrap_or_default())
    }
}

/// Hands out a capability whose credentials are refused once, then healthy
/// ones, like a token that expired while cached.
pub struct ExpiringCredentialFactory {
    connects: Arc<AtomicUsize>,
}

impl ExpiringCredentialFactory {
    pub fn new(connects: Arc<AtomicUsize>) -> Self {
        Self { connects }
    }
}

#[async_trait]
impl CapabilityFactory for ExpiringCredentialFactory {
    async fn connect(&self) -> Result<Arc<dyn GenerationCapability>, GenerationError> {
        let previous = self.connects.fetch_add(1, Ordering::SeqCst);
        let capability = if previous == 0 {
            ScriptedCapability::new().auth_failures(1)
        } else {
            ScriptedCapability::new()
        };
        Ok(Arc::new(capability))
    }
}

/// Factory whose connection always fails, like a bad credential.
pub struct FailingFactory;

#[async_trait]
impl CapabilityFactory for FailingFactory {
    async fn connect(&self) -> Result<Arc<dyn GenerationCapability>, GenerationError> {
        Err(GenerationError::Unavailable(
            "agent service rejected the credentials".to_string(),
        ))
    }
}

pub struct FakePdfRenderer;

#[async_trait]
impl PdfRenderer for FakePdfRenderer {
    async fn render(&self, html: &Path, pdf: &Path) -> Result<(), ConversionError> {
        let source = tokio::fs::read(html)
            .await
            .map_err(|e| ConversionError::Pdf(e.to_string()))?;
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend_from_slice(&source);
        tokio::fs::write(pdf, bytes)
            .await
            .map_err(|e| ConversionError::Pdf(e.to_string()))
    }
}

pub struct FakeDocxConverter;

#[async_trait]
impl DocxConverter for FakeDocxConverter {
    async fn convert(&self, _pdf: &Path, docx: &Path) -> Result<(), ConversionError> {
        tokio::fs::write(docx, b"PK\x03\x04fake-docx")
            .await
            .map_err(|e| ConversionError::Docx(e.to_string()))
    }
}

pub struct BrokenDocxConverter;

#[async_trait]
impl DocxConverter for BrokenDocxConverter {
    async fn convert(&self, _pdf: &Path, _docx: &Path) -> Result<(), ConversionError> {
        Err(ConversionError::Docx("pdf2docx exited with status 1".to_string()))
    }
}

/// Configuration with fast polling, writing under `output_dir`.
pub fn test_config(output_dir: &Path, api_key: Option<&str>) -> AppConfig {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("PROJECT_ENDPOINT", "https://example.services.ai.azure.com/api/projects/test".to_string());
    vars.insert("MODEL_DEPLOYMENT_NAME", "gpt-4o".to_string());
    vars.insert("OUTPUT_DIR", output_dir.display().to_string());
    vars.insert("GENERATION_POLL_INTERVAL_MS", "1".to_string());
    vars.insert("GENERATION_MAX_POLL_INTERVAL_MS", "5".to_string());
    vars.insert("GENERATION_TIMEOUT_SECS", "5".to_string());
    vars.insert("GENERATION_MAX_RETRIES", "2".to_string());
    if let Some(key) = api_key {
        vars.insert("API_KEY", key.to_string());
    }
    AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("valid test configuration")
}

pub fn test_state(output_dir: &Path, capability: Arc<ScriptedCapability>, api_key: Option<&str>) -> AppState {
    AppState::with_components(
        test_config(output_dir, api_key),
        Arc::new(CapabilityProvider::ready(capability)),
        Arc::new(FakePdfRenderer),
        Arc::new(FakeDocxConverter),
    )
    .expect("test state")
}

/// The single-sector scenario: residential stock in Selangor.
pub fn sample_payload() -> Value {
    json!({
        "title": "Q1 Stock",
        "period": "Jan-Mar 2025",
        "source": "NAPIC",
        "sections": {
            "residential": {
                "by_state": [
                    { "state": "Selangor", "existing": 1200, "incoming": 80, "planned": 40 }
                ],
                "trends": {
                    "half_year": ["H1 2024", "H1 2025"],
                    "completions": [10, 12],
                    "starts": [5, 6],
                    "new_planned": [3, 4]
                }
            }
        }
    })
}
