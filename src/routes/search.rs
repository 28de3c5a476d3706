use axum::extract::{Query, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::search::{SearchQuery, SearchResponse};

/// GET /api/search?q=...&limit=...: Ranked matches over spreadsheet cells.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = state.search.search(&params.q, params.limit).await?;
    Ok(Json(SearchResponse {
        query: params.q.trim().to_string(),
        count: results.len(),
        results,
    }))
}
