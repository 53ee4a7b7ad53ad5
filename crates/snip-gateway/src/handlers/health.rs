use crate::error::Result;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;

/// Reports durable store liveness.
pub async fn ping_handler(State(state): State<AppState>) -> Result<StatusCode> {
    state.service().ping().await?;
    Ok(StatusCode::OK)
}
