//! HTML → PDF → DOCX conversion chain for one job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::html::HtmlDocument;
use super::job::Job;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
    #[error("DOCX conversion failed: {0}")]
    Docx(String),
    #[error("converter reported success but {0} was not produced")]
    MissingOutput(PathBuf),
}

/// Prints an HTML file to PDF.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &Path, pdf: &Path) -> Result<(), ConversionError>;
}

/// Derives a DOCX file from a PDF.
#[async_trait]
pub trait DocxConverter: Send + Sync {
    async fn convert(&self, pdf: &Path, docx: &Path) -> Result<(), ConversionError>;
}

/// Local paths of a job's three artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub html: PathBuf,
    pub pdf: PathBuf,
    pub docx: PathBuf,
}

impl Artifacts {
    pub fn all(&self) -> [&Path; 3] {
        [self.html.as_path(), self.pdf.as_path(), self.docx.as_path()]
    }
}

pub struct ArtifactConverter {
    pdf: Arc<dyn PdfRenderer>,
    docx: Arc<dyn DocxConverter>,
}

impl ArtifactConverter {
    pub fn new(pdf: Arc<dyn PdfRenderer>, docx: Arc<dyn DocxConverter>) -> Self {
        Self { pdf, docx }
    }

    /// Persist the document and derive the PDF and DOCX next to it.
    ///
    /// Stops at the first failure; files written before it stay on disk.
    pub async fn convert(&self, job: &Job, html: &HtmlDocument) -> Result<Artifacts, ConversionError> {
        let artifacts = Artifacts {
            html: job.html_path(),
            pdf: job.pdf_path(),
            docx: job.docx_path(),
        };

        tokio::fs::write(&artifacts.html, html.as_str())
            .await
            .map_err(|source| ConversionError::Write {
                path: artifacts.html.clone(),
                source,
            })?;
        log::info!("Wrote {}", artifacts.html.display());

        self.pdf.render(&artifacts.html, &artifacts.pdf).await?;
        ensure_exists(&artifacts.pdf).await?;
        log::info!("Rendered {}", artifacts.pdf.display());

        self.docx.convert(&artifacts.pdf, &artifacts.docx).await?;
        ensure_exists(&artifacts.docx).await?;
        log::info!("Converted {}", artifacts.docx.display());

        Ok(artifacts)
    }
}

async fn ensure_exists(path: &Path) -> Result<(), ConversionError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ConversionError::MissingOutput(path.to_path_buf())),
    }
}
