//! Job identity and the per-job directory layout.
//!
//! ```text
//! {output_dir}/{job_id}/
//!     {job_id}.html
//!     {job_id}.pdf
//!     {job_id}.docx
//!     charts/{sector}_{chart}.svg
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use thiserror::Error;

const MAX_SUFFIX: u32 = 100;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to create job directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no free job id for {0}")]
    Exhausted(String),
}

/// Lower-case ASCII alphanumerics joined by single underscores.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut gap = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('_');
            }
            gap = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}

/// A report job and the directory it exclusively owns.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub dir: PathBuf,
}

impl Job {
    /// Allocate `{slug}_{YYYYMMDD_HHMMSS}` under `output_dir`.
    ///
    /// A second job in the same second for the same title gets `_2`, `_3`, ...
    pub fn create<Tz>(output_dir: &Path, title: &str, now: DateTime<Tz>) -> Result<Job, JobError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let base = format!("{}_{}", slugify(title), now.format("%Y%m%d_%H%M%S"));
        fs::create_dir_all(output_dir).map_err(|source| JobError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        for n in 1..=MAX_SUFFIX {
            let id = if n == 1 {
                base.clone()
            } else {
                format!("{}_{}", base, n)
            };
            let dir = output_dir.join(&id);
            match fs::create_dir(&dir) {
                Ok(()) => {
                    log::info!("Created job {} at {}", id, dir.display());
                    return Ok(Job { id, dir });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(JobError::CreateDir { path: dir, source }),
            }
        }
        Err(JobError::Exhausted(base))
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.dir.join("charts")
    }

    /// `{job_id}.{extension}`
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.id, extension)
    }

    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        self.dir.join(self.file_name(extension))
    }

    pub fn html_path(&self) -> PathBuf {
        self.artifact_path("html")
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.artifact_path("pdf")
    }

    pub fn docx_path(&self) -> PathBuf {
        self.artifact_path("docx")
    }

    pub fn download_url(&self, extension: &str) -> String {
        format!("/download/{}/{}", self.id, self.file_name(extension))
    }
}
