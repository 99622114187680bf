use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{error::Result, middleware::auth::Claims, AppState};

#[utoipa::path(
    get,
    path = "/api/analytics",
    responses(
        (status = 200, description = "Completed sessions and checklist failure counts")
    )
)]
#[axum::debug_handler]
pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let summary = state.analytics_service.summary(&claims.sub).await?;
    Ok(Json(summary))
}
