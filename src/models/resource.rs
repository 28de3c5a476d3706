use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// A spreadsheet the active credential can read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

/// Tabular formats a spreadsheet can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ExportFormat {
    #[strum(serialize = "text/csv")]
    Csv,
}

impl ExportFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
        }
    }
}

/// Location of an exported artifact, ready to be downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTicket {
    pub resource_id: String,
    pub file_name: String,
    pub format: ExportFormat,
    pub download_url: String,
}
