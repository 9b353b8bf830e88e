use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use df_factory::AppSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// Missing fields deserialize as empty. The name is free text; an empty
/// command is rejected by the factory with `INVALID_REQUEST`.
#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateAppResponse {
    pub id: Uuid,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

pub async fn list_apps(State(state): State<AppState>) -> Json<Vec<AppSummary>> {
    Json(state.factory.list().await)
}

pub async fn get_app(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppSummary>, ApiErrorResponse> {
    Ok(Json(state.factory.get(&id).await?))
}

pub async fn create_app(
    State(state): State<AppState>,
    Json(body): Json<CreateAppRequest>,
) -> Result<(StatusCode, Json<CreateAppResponse>), ApiErrorResponse> {
    let created = state
        .factory
        .create(&body.name, &body.command, &body.args)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateAppResponse {
            id: created.handle,
            warnings: created.warnings,
        }),
    ))
}

pub async fn stop_app(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiErrorResponse> {
    state.factory.stop(&id).await?;
    Ok(SuccessResponse::ok())
}

pub async fn remove_app(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiErrorResponse> {
    state.factory.remove(&id).await?;
    Ok(SuccessResponse::ok())
}
