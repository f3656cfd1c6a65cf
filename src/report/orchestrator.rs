//! Report orchestration: narrative, translation, charts and HTML assembly.
//!
//! The English narrative and its translation run one after the other while
//! the charts render on the blocking pool. HTML assembly waits for all three.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::agents::{
    generate, CapabilityProvider, GenerationCapability, GenerationError, GenerationPolicy,
    ENGLISH_REPORT, HTML_MAKER, MALAY_REPORT,
};
use crate::charts::{build_report_charts, chart_hrefs, ChartError, ChartFactory, ChartMap};
use crate::payload::ReportPayload;

use super::html::{FormatError, HtmlDocument};
use super::job::Job;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("HTML maker returned an unusable document: {0}")]
    Format(#[from] FormatError),
    #[error("chart rendering failed: {0}")]
    Chart(#[from] ChartError),
    #[error("chart task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("failed to serialise payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Everything a job produced before conversion.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub english_report_text: String,
    pub malay_report_text: String,
    pub charts: ChartMap,
    pub html: HtmlDocument,
}

pub struct ReportOrchestrator {
    provider: Arc<CapabilityProvider>,
    policy: GenerationPolicy,
}

impl ReportOrchestrator {
    pub fn new(provider: Arc<CapabilityProvider>, policy: GenerationPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    /// Produce the narrative, translation, charts and HTML for `payload`.
    ///
    /// Any failed step aborts the job; there is no partial document.
    pub async fn orchestrate(
        &self,
        payload: &ReportPayload,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument, OrchestrationError> {
        let capability = self.provider.get().await?;
        let result = self.produce(capability.as_ref(), payload, job, cancel).await;
        if let Err(OrchestrationError::Generation(e)) = &result {
            self.provider.report_failure(e);
        }
        result
    }

    async fn produce(
        &self,
        capability: &dyn GenerationCapability,
        payload: &ReportPayload,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument, OrchestrationError> {
        let input = serde_json::to_value(payload)?;

        let factory = ChartFactory::new(job.charts_dir());
        let sections = payload.sections.clone();
        let charts_task =
            tokio::task::spawn_blocking(move || build_report_charts(&factory, &sections));

        let texts = async {
            let english = generate(
                capability,
                &ENGLISH_REPORT,
                &input,
                &self.policy,
                cancel,
            )
            .await?;
            let malay = generate(
                capability,
                &MALAY_REPORT,
                &json!({ "english_report_text": english }),
                &self.policy,
                cancel,
            )
            .await?;
            Ok::<_, GenerationError>((english, malay))
        };

        let (texts, charts) = tokio::join!(texts, charts_task);
        let (english_report_text, malay_report_text) = texts?;
        let charts = charts??;
        log::info!(
            "Job {}: narrative ready, {} chart group(s) rendered",
            job.id,
            charts.len()
        );

        let html_input = json!({
            "title": payload.title(),
            "period": payload.period,
            "generated_on": payload.generated_on(),
            "english_report_text": english_report_text,
            "malay_report_text": malay_report_text,
            "charts": chart_hrefs(&charts),
        });
        let raw = generate(
            capability,
            &HTML_MAKER,
            &html_input,
            &self.policy,
            cancel,
        )
        .await?;
        let html = HtmlDocument::parse(&raw).map_err(|e| {
            log::error!("Job {}: {}", job.id, e);
            e
        })?;

        Ok(GeneratedDocument {
            english_report_text,
            malay_report_text,
            charts,
            html,
        })
    }
}
