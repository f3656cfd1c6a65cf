//! Report payload: the typed input document and its ingestion checks.

pub mod models;
pub mod validation;

pub use models::{
    Measure, ReportPayload, Sections, Sector, SectorData, Stage, StateRow, Trends,
    DEFAULT_TITLE,
};
pub use validation::{ValidationError, ValidationErrors};
