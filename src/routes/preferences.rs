use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::preferences_dto::{PreferencesResponse, UpdatePreferencesRequest},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/profile/preferences",
    responses(
        (status = 200, description = "Stored or default preferences", body = Json<PreferencesResponse>)
    )
)]
#[axum::debug_handler]
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let preferences = state.preference_service.get(&claims.sub).await?;
    Ok(Json(PreferencesResponse { ok: true, preferences }))
}

#[utoipa::path(
    patch,
    path = "/api/profile/preferences",
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Preferences updated", body = Json<PreferencesResponse>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let preferences = state
        .preference_service
        .update(&claims.sub, payload.into())
        .await?;
    Ok(Json(PreferencesResponse { ok: true, preferences }))
}
