use std::fmt;

use thiserror::Error;

/// Shape of a successful `POST /api/report` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// JSON with download links for all three artifacts.
    #[default]
    Links,
    Zip,
    Pdf,
    Docx,
    Html,
}

#[derive(Debug, Error, PartialEq)]
#[error("Unsupported format '{0}'. Use one of: links, zip, pdf, docx, html")]
pub struct UnsupportedFormat(pub String);

impl ResponseFormat {
    /// Parse the `format` query value; absent or blank means links.
    pub fn parse(raw: Option<&str>) -> Result<Self, UnsupportedFormat> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(Self::Links);
        };
        match raw.to_lowercase().as_str() {
            "links" => Ok(Self::Links),
            "zip" => Ok(Self::Zip),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "html" => Ok(Self::Html),
            _ => Err(UnsupportedFormat(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Links => "links",
            Self::Zip => "zip",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
