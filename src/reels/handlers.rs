use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::ApiResult,
    reels::{
        dto::{ReelCreated, ReelForm, ReelResponse},
        repo::Reel,
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/reels", get(list_reels))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/reels", post(create_reel))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // 50MB, video uploads
}

#[instrument(skip(state, multipart))]
pub async fn create_reel(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ReelCreated>)> {
    let request = ReelForm::from_multipart(multipart).await?.validate()?;

    let file_name = state.uploads.save(request.file).await?;
    let reel = Reel::create(&state.db, &request.description, &file_name).await?;

    info!(reel_id = %reel.id, file = %reel.file_name, "reel posted");
    Ok((
        StatusCode::CREATED,
        Json(ReelCreated {
            message: "Reel posted".into(),
            reel: ReelResponse::from(reel),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_reels(State(state): State<AppState>) -> ApiResult<Json<Vec<ReelResponse>>> {
    let reels = Reel::list_newest_first(&state.db).await?;
    Ok(Json(reels.into_iter().map(ReelResponse::from).collect()))
}
