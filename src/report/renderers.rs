//! Production conversion engines: headless Chromium and the `pdf2docx` CLI.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Emulation;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use reqwest::Url;
use tokio::process::Command;

use super::converter::{ConversionError, DocxConverter, PdfRenderer};

/// Prints pages with a headless Chromium driven over CDP.
pub struct ChromePdfRenderer {
    chrome_path: Option<PathBuf>,
}

impl ChromePdfRenderer {
    /// `None` lets the browser be located on the system.
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }
}

fn print_to_pdf(chrome_path: Option<PathBuf>, url: &str) -> anyhow::Result<Vec<u8>> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .path(chrome_path)
        .build()
        .map_err(|e| anyhow!("invalid browser launch options: {}", e))?;

    let browser = Browser::new(options).context("failed to launch headless Chromium")?;
    let tab = browser.new_tab().context("failed to open a browser tab")?;
    tab.navigate_to(url)
        .context("navigation failed")?
        .wait_until_navigated()
        .context("page did not finish loading")?;

    tab.call_method(Emulation::SetEmulatedMedia {
        media: Some("screen".to_string()),
        features: None,
    })
    .context("failed to emulate screen media")?;

    tab.print_to_pdf(Some(PrintToPdfOptions {
        print_background: Some(true),
        prefer_css_page_size: Some(true),
        ..Default::default()
    }))
    .context("print to PDF failed")
}

#[async_trait]
impl PdfRenderer for ChromePdfRenderer {
    async fn render(&self, html: &Path, pdf: &Path) -> Result<(), ConversionError> {
        let absolute = tokio::fs::canonicalize(html)
            .await
            .map_err(|e| ConversionError::Pdf(format!("cannot resolve {}: {}", html.display(), e)))?;
        let url = Url::from_file_path(&absolute)
            .map_err(|_| ConversionError::Pdf(format!("cannot build file URL for {}", absolute.display())))?;

        let chrome_path = self.chrome_path.clone();
        let bytes = tokio::task::spawn_blocking(move || print_to_pdf(chrome_path, url.as_str()))
            .await
            .map_err(|e| ConversionError::Pdf(e.to_string()))?
            .map_err(|e| ConversionError::Pdf(format!("{:#}", e)))?;

        tokio::fs::write(pdf, bytes)
            .await
            .map_err(|source| ConversionError::Write {
                path: pdf.to_path_buf(),
                source,
            })
    }
}

/// Runs `pdf2docx convert <pdf> <docx>`.
pub struct Pdf2DocxConverter {
    program: String,
}

impl Pdf2DocxConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DocxConverter for Pdf2DocxConverter {
    async fn convert(&self, pdf: &Path, docx: &Path) -> Result<(), ConversionError> {
        let output = Command::new(&self.program)
            .arg("convert")
            .arg(pdf)
            .arg(docx)
            .output()
            .await
            .map_err(|e| ConversionError::Docx(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::Docx(format!(
                "{} exited with status {}: {}",
                self.program,
                code,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
