use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;
use tradeintel_search::{AggregateResult, SearchError, SearchParams};

use crate::middleware::RequestId;

use super::{normalize_max_results, ApiError, ApiResponse, AppState, ResponseMeta};

/// Body of `POST /api/v1/search`. Every field is optional on the wire;
/// [`SearchRequest::validate`] enforces what the search needs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct SearchRequest {
    product_name: String,
    /// HS (GTIP) code.
    gtip_code: String,
    oem_no: String,
    target_country: String,
    search_language: String,
    related_sectors: String,
    competitor_brands: String,
    search_engines: Vec<String>,
    db_sources: Vec<String>,
    max_results: Option<i64>,
}

impl SearchRequest {
    /// Search parameters plus the selected sources (engines first).
    fn validate(self) -> Result<(SearchParams, Vec<String>), String> {
        let params = SearchParams::new(&self.product_name)
            .with_hs_code(&self.gtip_code)
            .with_oem_number(&self.oem_no)
            .with_target_country(&self.target_country)
            .with_language(&self.search_language)
            .with_related_sectors(&self.related_sectors)
            .with_competitor_brands(&self.competitor_brands);
        if params.is_blank() {
            return Err("one of productName, gtipCode or oemNo is required".to_string());
        }

        let sources = self
            .search_engines
            .into_iter()
            .chain(self.db_sources)
            .collect();
        Ok((params, sources))
    }
}

/// `POST /api/v1/search`: the aggregate inside the standard envelope.
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AggregateResult>>, ApiError> {
    let data = run_search(&state, &req_id, payload).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `POST /search`: the aggregate without the envelope.
pub(super) async fn search_bare(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<AggregateResult>, ApiError> {
    run_search(&state, &req_id, payload).await.map(Json)
}

async fn run_search(
    state: &AppState,
    req_id: &RequestId,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<AggregateResult, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;
    let max_results = normalize_max_results(request.max_results, state.default_max_results);
    let (params, sources) = request
        .validate()
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    tracing::info!(
        request_id = %req_id.0,
        query = %params.query(),
        sources = sources.len(),
        max_results,
        "search requested"
    );

    state
        .orchestrator
        .search_all_sources(&params, &sources, max_results)
        .await
        .map_err(|e: SearchError| {
            ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
        })
}
