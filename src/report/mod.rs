//! Report jobs: orchestration, artifact conversion and the HTTP surface.

pub mod bundle;
pub mod converter;
pub mod format;
pub mod handlers;
pub mod html;
pub mod job;
pub mod orchestrator;
pub mod renderers;

pub use converter::{ArtifactConverter, Artifacts, ConversionError, DocxConverter, PdfRenderer};
pub use format::ResponseFormat;
pub use html::{FormatError, HtmlDocument};
pub use job::{slugify, Job, JobError};
pub use orchestrator::{GeneratedDocument, OrchestrationError, ReportOrchestrator};
