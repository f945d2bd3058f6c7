use axum::{extract::State, Extension, Json};
use tradeintel_search::SourceInfo;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

/// `GET /api/v1/sources`: every registered adapter, in registration order.
pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<SourceInfo>>> {
    Json(ApiResponse {
        data: state.orchestrator.registry().describe(),
        meta: ResponseMeta::new(req_id.0),
    })
}
