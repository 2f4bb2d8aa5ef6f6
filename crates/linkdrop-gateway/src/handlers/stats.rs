use crate::error::Result;
use crate::model::{FileSummary, StatsReport, UrlSummary};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{Timestamp, Zoned};

/// Totals across both services, plus what was added today in local time.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsReport>> {
    let today = Zoned::now().date();
    let urls = state.shortener.list().await?;
    let files = state.uploads.list().await?;

    let urls = UrlSummary {
        total: urls.len(),
        total_clicks: urls.iter().map(|r| r.clicks).sum(),
        today_created: urls.iter().filter(|r| on_day(r.created_at, today)).count(),
    };
    let files = FileSummary {
        total: files.len(),
        total_size: files.iter().map(|r| r.size).sum(),
        total_downloads: files.iter().map(|r| r.downloads).sum(),
        today_uploaded: files.iter().filter(|r| on_day(r.upload_date, today)).count(),
    };

    Ok(Json(StatsReport {
        success: true,
        timestamp: Timestamp::now(),
        urls,
        files,
    }))
}

fn on_day(ts: Timestamp, day: Date) -> bool {
    ts.to_zoned(TimeZone::system()).date() == day
}
