use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::TeamDto;
use super::{ApiError, ApiResponse, AppState};
use crate::db::TeamInput;

#[derive(Debug, Deserialize)]
pub struct TeamForm {
    pub name: Option<String>,
    pub rank: Option<i32>,
    pub wins: Option<i32>,
    pub losses: Option<i32>,
    pub web_id: Option<i32>,
    pub user_id: Option<i32>,
}

impl From<TeamForm> for TeamInput {
    fn from(form: TeamForm) -> Self {
        Self {
            name: form.name,
            rank: form.rank,
            wins: form.wins,
            losses: form.losses,
            web_id: form.web_id,
            user_id: form.user_id,
        }
    }
}

/// POST /api/teams
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TeamForm>,
) -> Result<Json<ApiResponse<TeamDto>>, ApiError> {
    let team = state.store().create_team(&payload.into()).await?;
    Ok(Json(ApiResponse::success(TeamDto::from(team))))
}

/// GET /api/teams
/// All teams, rank descending.
pub async fn list_teams(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TeamDto>>>, ApiError> {
    let teams = state.store().list_teams().await?;
    let dtos: Vec<TeamDto> = teams.into_iter().map(TeamDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /api/teams/{id}
pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TeamDto>>, ApiError> {
    let team = state
        .store()
        .get_team(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team", id))?;

    Ok(Json(ApiResponse::success(TeamDto::from(team))))
}

/// PUT /api/teams/{id}
/// Claims the team for the authenticated user. Only the owner column is
/// persisted; the rest of the submitted form is accepted but discarded
/// (observed behavior of this endpoint since the beginning, kept under a
/// regression test).
pub async fn update_team(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(_form): Json<TeamForm>,
) -> Result<Json<ApiResponse<TeamDto>>, ApiError> {
    let team = state
        .store()
        .assign_team_owner(id, Some(user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Team", id))?;

    Ok(Json(ApiResponse::success(TeamDto::from(team))))
}
