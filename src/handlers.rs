use crate::{
    auth::AuthenticatedUser,
    errors::AppError,
    extract::{AppJson, AppPath, AppQuery},
    feed,
    models::{CreateMemeRequest, Meme, SwipeRequest, VoteKind},
    swipe, AppState,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing;
use uuid::Uuid;

/// Upper bound on `?limit=` for the listing endpoints.
pub const MAX_LIST_LIMIT: usize = 100;
const DEFAULT_RECENT_LIMIT: usize = 20;
const DEFAULT_TOP_LIMIT: usize = 9;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

impl ListParams {
    /// Zero is rejected; anything above `MAX_LIST_LIMIT` is clamped.
    fn resolve(&self, default: usize) -> Result<usize, AppError> {
        match self.limit {
            Some(0) => Err(AppError::InvalidInput("limit must be at least 1".to_string())),
            Some(n) => Ok(n.min(MAX_LIST_LIMIT)),
            None => Ok(default),
        }
    }
}

/// POST /memes: hash the referenced image and store a new meme owned by the caller.
pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    AppJson(payload): AppJson<CreateMemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let image_url = payload.image_url.trim().to_string();
    if image_url.is_empty() {
        return Err(AppError::InvalidInput("image_url cannot be empty".to_string()));
    }

    let perceptual_hash = state.hasher.hash(&image_url).await?;

    let meme = Meme {
        meme_id: Uuid::new_v4(),
        image_url,
        cluster_id: perceptual_hash.clone(),
        perceptual_hash,
        created_at: Utc::now(),
        like_count: 0,
        share_count: 0,
        user_id: Some(user_id),
        title: payload.title.filter(|t| !t.trim().is_empty()),
        description: payload.description.filter(|d| !d.trim().is_empty()),
    };
    state.meme_repo.create(&meme).await?;

    tracing::info!(meme_id = %meme.meme_id, cluster_id = %meme.cluster_id, "Meme created successfully via handler");
    Ok((StatusCode::CREATED, Json(meme)))
}

/// GET /memes?limit=N: newest memes first.
pub async fn list_memes(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<Vec<Meme>>, AppError> {
    let limit = params.resolve(DEFAULT_RECENT_LIMIT)?;
    let memes = state.meme_repo.list_recent(limit).await?;
    tracing::debug!(count = memes.len(), "Listed recent memes via handler");
    Ok(Json(memes))
}

/// GET /memes/top?limit=N: most liked memes first.
pub async fn top_memes(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<Vec<Meme>>, AppError> {
    let limit = params.resolve(DEFAULT_TOP_LIMIT)?;
    let memes = state.meme_repo.list_top(limit).await?;
    tracing::debug!(count = memes.len(), "Listed top memes via handler");
    Ok(Json(memes))
}

/// POST /swipe. The user id comes from the body; this endpoint is not authenticated.
pub async fn swipe_meme(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<SwipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kind: VoteKind = payload.action.parse().map_err(AppError::InvalidInput)?;
    let meme_id = Uuid::parse_str(payload.meme_id.trim())?;
    if payload.user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user_id cannot be empty".to_string()));
    }

    swipe::record_swipe(&state, &payload.user_id, meme_id, kind, Utc::now()).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// GET /feed/{user_id}
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    AppPath(user_id): AppPath<String>,
) -> Result<Json<Vec<Meme>>, AppError> {
    tracing::debug!(%user_id, "Building feed via handler");
    let memes = feed::assemble_feed(&state, &user_id, Utc::now()).await?;
    Ok(Json(memes))
}

/// GET /meme/{id}
pub async fn get_meme(
    State(state): State<Arc<AppState>>,
    AppPath(id_str): AppPath<String>,
) -> Result<Json<Meme>, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%meme_id, "Fetching meme details via handler");
    let maybe_meme = state.meme_repo.get_by_id(meme_id).await?;
    match maybe_meme {
        Some(meme) => Ok(Json(meme)),
        None => Err(AppError::MemeNotFound(meme_id)),
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
