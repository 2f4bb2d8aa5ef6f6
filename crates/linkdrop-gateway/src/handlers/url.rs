use crate::error::{AppError, Result};
use crate::model::{
    DataResponse, MessageResponse, ShortenRequest, ShortenResponse, StatsResponse, UrlData,
    UrlListResponse, UrlStatsData,
};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use linkdrop_core::ShortCode;
use linkdrop_shortener::ShortenParams;

use super::user_agent;

pub async fn shorten_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>)> {
    let Json(request) = payload?;
    let outcome = state
        .shortener
        .shorten(ShortenParams {
            original_url: request.url,
            custom_alias: request.custom_alias,
            user_agent: user_agent(&headers),
        })
        .await?;

    let (status, message) = if outcome.existing {
        (StatusCode::OK, Some("URL already shortened".to_string()))
    } else {
        (StatusCode::CREATED, None)
    };
    let record = outcome.record;
    Ok((
        status,
        Json(ShortenResponse {
            success: true,
            short_url: record.short_code.to_url(&state.base_url(&headers)),
            short_id: record.short_code.as_str().to_string(),
            original_url: record.original_url,
            clicks: record.clicks,
            created_at: record.created_at,
            message,
        }),
    ))
}

pub async fn list_urls_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UrlListResponse>> {
    let base_url = state.base_url(&headers);
    let urls: Vec<_> = state
        .shortener
        .list()
        .await?
        .into_iter()
        .map(|record| UrlData::new(record, &base_url))
        .collect();
    Ok(Json(UrlListResponse {
        success: true,
        count: urls.len(),
        urls,
    }))
}

pub async fn url_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse<UrlStatsData>>> {
    let stats = state.shortener.stats().await?;
    Ok(Json(StatsResponse::ok(stats.into())))
}

pub async fn get_url_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataResponse<UrlData>>> {
    let code = parse_code(&short_id)?;
    let record = state
        .shortener
        .info(&code)
        .await?
        .ok_or_else(|| url_not_found(&short_id))?;
    Ok(Json(DataResponse::ok(UrlData::new(
        record,
        &state.base_url(&headers),
    ))))
}

pub async fn delete_url_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>> {
    let code = parse_code(&short_id)?;
    if !state.shortener.delete(&code).await? {
        return Err(url_not_found(&short_id));
    }
    Ok(Json(MessageResponse::ok("Short URL deleted")))
}

/// A string that is not a valid code cannot name a stored URL.
pub(super) fn parse_code(short_id: &str) -> Result<ShortCode> {
    ShortCode::parse(short_id).map_err(|_| url_not_found(short_id))
}

pub(super) fn url_not_found(short_id: &str) -> AppError {
    AppError::NotFound(format!("short url {short_id} not found"))
}
