//! Ranked cell search across the spreadsheets the active credential can read.

use std::cmp::Ordering;

use crate::error::AppError;
use crate::models::credential::ServiceAccountKey;
use crate::models::resource::{ExportFormat, Resource};
use crate::models::search::SearchHit;
use crate::services::resources::ResourceLister;
use crate::services::sheet_parser::{self, ParsedSheet};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;
const FUZZY_THRESHOLD: f64 = 0.88;

pub struct SearchService {
    lister: ResourceLister,
    max_spreadsheets: usize,
}

impl SearchService {
    pub fn new(lister: ResourceLister, max_spreadsheets: usize) -> Self {
        Self {
            lister,
            max_spreadsheets,
        }
    }

    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidQuery("Search query must not be empty".to_string()));
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let credential = self.lister.credentials().require_active().await?;
        let resources = self.lister.list_with(&credential).await?;

        let mut hits = Vec::new();
        for resource in resources.iter().take(self.max_spreadsheets) {
            match self.load(&credential, resource).await {
                Ok(sheet) => hits.extend(match_sheet(resource, &sheet, query)),
                Err(e) => {
                    tracing::warn!(
                        resource_id = %resource.id,
                        error = %e,
                        "Skipping spreadsheet during search"
                    );
                }
            }
        }

        // Stable sort keeps spreadsheet order and row order among equal scores.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(limit);

        tracing::info!(query = %query, hits = hits.len(), "Search finished");
        Ok(hits)
    }

    async fn load(&self, credential: &ServiceAccountKey, resource: &Resource) -> Result<ParsedSheet, AppError> {
        let source = self.lister.source();
        let ticket = source
            .request_export(credential, resource, ExportFormat::Csv)
            .await?;
        let bytes = source.download(credential, &ticket).await?;
        sheet_parser::parse_csv(&bytes).map_err(|e| AppError::Internal(e.to_string()))
    }
}

/// Score a cell against the query; `None` when it is not a match.
pub fn score_cell(query: &str, cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let query = query.to_lowercase();
    let cell = cell.to_lowercase();

    if cell == query {
        return Some(1.0);
    }
    let similarity = strsim::jaro_winkler(&query, &cell);
    if cell.contains(&query) {
        return Some(0.8 + 0.2 * similarity);
    }
    (similarity >= FUZZY_THRESHOLD).then(|| 0.7 * similarity)
}

fn match_sheet(resource: &Resource, sheet: &ParsedSheet, query: &str) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for (index, row) in sheet.rows.iter().enumerate() {
        for (column, value) in sheet.columns.iter().zip(row) {
            if let Some(score) = score_cell(query, value) {
                hits.push(SearchHit {
                    spreadsheet_id: resource.id.clone(),
                    spreadsheet: resource.name.clone(),
                    row: index + 2,
                    column: column.clone(),
                    value: value.clone(),
                    score,
                });
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_ordering() {
        let exact = score_cell("acme", "ACME").unwrap();
        let contains = score_cell("acme", "Acme Corporation").unwrap();
        let fuzzy = score_cell("acme", "acmee").unwrap();
        assert_eq!(exact, 1.0);
        assert!(contains < exact && contains >= 0.8);
        assert!(fuzzy < contains);
        assert!(score_cell("acme", "zebra").is_none());
        assert!(score_cell("acme", "   ").is_none());
    }

    #[test]
    fn test_hits_point_at_sheet_rows() {
        let resource = Resource {
            id: "s1".into(),
            name: "Vendors".into(),
            mime_type: None,
            modified_time: None,
        };
        let sheet = sheet_parser::parse_csv(b"Name,City\nAcme,Oslo\nGlobex,Acme Falls\n").unwrap();
        let hits = match_sheet(&resource, &sheet, "acme");
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].row, hits[0].column.as_str()), (2, "Name"));
        assert_eq!((hits[1].row, hits[1].column.as_str()), (3, "City"));
    }
}
