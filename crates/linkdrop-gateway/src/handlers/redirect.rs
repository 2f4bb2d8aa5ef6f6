use crate::error::Result;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::url::{parse_code, url_not_found};

/// Permanent redirect to the original URL, counting the visit.
pub async fn redirect_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let code = parse_code(&short_id)?;
    let record = state
        .shortener
        .resolve(&code)
        .await?
        .ok_or_else(|| url_not_found(&short_id))?;

    debug!(code = %code, clicks = record.clicks, "redirecting");
    Ok((
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, record.original_url)],
    )
        .into_response())
}
