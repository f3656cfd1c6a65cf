//! Shared application state handed to every request handler.

use std::sync::Arc;

use crate::agents::{AzureAgentsFactory, CapabilityProvider};
use crate::config::AppConfig;
use crate::report::converter::{ArtifactConverter, DocxConverter, PdfRenderer};
use crate::report::orchestrator::ReportOrchestrator;
use crate::report::renderers::{ChromePdfRenderer, Pdf2DocxConverter};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub provider: Arc<CapabilityProvider>,
    pub orchestrator: Arc<ReportOrchestrator>,
    pub converter: Arc<ArtifactConverter>,
}

impl AppState {
    /// Build the production state: Azure agents, headless Chromium, pdf2docx.
    pub fn new(config: AppConfig) -> std::io::Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(900))
            .user_agent(concat!("property-stock-report/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let provider = Arc::new(CapabilityProvider::new(Box::new(AzureAgentsFactory::new(
            config.agents.clone(),
            http_client,
        ))));
        let pdf: Arc<dyn PdfRenderer> = Arc::new(ChromePdfRenderer::new(config.chrome_path.clone()));
        let docx: Arc<dyn DocxConverter> =
            Arc::new(Pdf2DocxConverter::new(config.pdf2docx_path.clone()));

        Self::with_components(config, provider, pdf, docx)
    }

    /// Build the state around caller-supplied engines.
    pub fn with_components(
        config: AppConfig,
        provider: Arc<CapabilityProvider>,
        pdf: Arc<dyn PdfRenderer>,
        docx: Arc<dyn DocxConverter>,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        log::info!("Report output directory: {}", config.output_dir.display());

        let orchestrator = Arc::new(ReportOrchestrator::new(
            provider.clone(),
            config.generation.clone(),
        ));
        let converter = Arc::new(ArtifactConverter::new(pdf, docx));

        Ok(AppState {
            config: Arc::new(config),
            provider,
            orchestrator,
            converter,
        })
    }
}
