//! Driving a generation run to completion: polling, retries, deadline and
//! cancellation.

use std::future::Future;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use super::{AgentProfile, GenerationCapability, GenerationError, RunHandle};

/// Timing and retry knobs for [`generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPolicy {
    /// First wait between polls.
    pub poll_interval: Duration,
    /// Ceiling for the poll interval once backoff kicks in.
    pub max_poll_interval: Duration,
    /// Interval multiplier per poll; 1.0 keeps polling at a fixed rate.
    pub backoff_factor: f64,
    /// Overall deadline for one generation, submission included.
    pub timeout: Duration,
    /// Extra attempts after a transient submission or poll failure.
    pub max_retries: u32,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(750),
            max_poll_interval: Duration::from_millis(5000),
            backoff_factor: 1.0,
            timeout: Duration::from_secs(600),
            max_retries: 2,
        }
    }
}

impl GenerationPolicy {
    pub fn next_interval(&self, current: Duration) -> Duration {
        current
            .mul_f64(self.backoff_factor.max(1.0))
            .min(self.max_poll_interval.max(self.poll_interval))
    }
}

/// The message body every agent receives.
pub fn build_message(profile: &AgentProfile, input: &Value) -> String {
    json!({ "hint": profile.hint, "input": input }).to_string()
}

/// Run `profile`'s agent on `input` and return its text output.
pub async fn generate(
    capability: &dyn GenerationCapability,
    profile: &AgentProfile,
    input: &Value,
    policy: &GenerationPolicy,
    cancel: &CancellationToken,
) -> Result<String, GenerationError> {
    let message = build_message(profile, input);

    let work = async {
        let started = Instant::now();
        let thread_id =
            with_retries(policy, "create thread", || capability.create_thread(&message)).await?;
        let mut attempts = 0u32;
        let run = with_retries(policy, "start run", || {
            attempts += 1;
            start_or_resume(capability, profile, &thread_id, attempts > 1)
        })
        .await?;
        log::info!(
            "Agent '{}' started run {} on thread {}",
            profile.name,
            run.run_id,
            run.thread_id
        );

        let mut interval = policy.poll_interval;
        loop {
            sleep(interval).await;
            let state = with_retries(policy, "poll", || capability.poll_status(&run)).await?;
            log::debug!(
                "Run {} status {} after {:?}",
                run.run_id,
                state.status,
                started.elapsed()
            );

            if state.status.is_terminal() {
                if state.status.is_success() {
                    break;
                }
                log::error!(
                    "Agent '{}' run {} ended as {}",
                    profile.name,
                    run.run_id,
                    state.status
                );
                return Err(GenerationError::RunFailed {
                    status: state.status,
                    message: state
                        .last_error
                        .unwrap_or_else(|| "no error details reported".to_string()),
                });
            }
            interval = policy.next_interval(interval);
        }

        let text = capability.fetch_result(&run).await?;
        log::info!(
            "Agent '{}' finished in {:?} ({} chars)",
            profile.name,
            started.elapsed(),
            text.len()
        );
        Ok(text)
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            log::warn!("Generation with agent '{}' cancelled", profile.name);
            Err(GenerationError::Cancelled)
        }
        result = timeout(policy.timeout, work) => match result {
            Ok(outcome) => outcome,
            Err(_) => {
                log::error!("Generation with agent '{}' timed out", profile.name);
                Err(GenerationError::Timeout(policy.timeout))
            }
        },
    }
}

/// Start a run on `thread_id`. A retry first looks for a run the previous
/// attempt created before its response was lost.
async fn start_or_resume(
    capability: &dyn GenerationCapability,
    profile: &AgentProfile,
    thread_id: &str,
    retrying: bool,
) -> Result<RunHandle, GenerationError> {
    if retrying {
        if let Some(run) = capability.find_run(thread_id).await? {
            log::info!("Resuming run {} on thread {}", run.run_id, thread_id);
            return Ok(run);
        }
    }
    capability.start_run(profile, thread_id).await
}

async fn with_retries<T, F, Fut>(
    policy: &GenerationPolicy,
    operation: &str,
    mut attempt_fn: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt = 0;
    let mut delay = policy.poll_interval;
    loop {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                log::warn!(
                    "{} failed (retry {}/{}): {}",
                    operation,
                    attempt,
                    policy.max_retries,
                    e
                );
                sleep(delay).await;
                delay = policy.next_interval(delay);
            }
            Err(e) => return Err(e),
        }
    }
}
