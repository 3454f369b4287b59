use crate::error::ApiError;
use crate::server::AppState;
use crate::token::authorize;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use http::header;
use moodle_prom_core::ExporterError;
use moodle_prom_observability::ScrapeOutcome;
use std::sync::Arc;
use std::time::Instant;

const TEXT_PLAIN: &str = "text/plain";

/// Query parameters of a scrape. A repeated key keeps its last value.
#[derive(Debug, Default)]
pub struct ScrapeParams {
    pub token: Option<String>,
    pub timeframe: Option<String>,
}

impl ScrapeParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "token" => params.token = Some(value),
                "timeframe" => params.timeframe = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// Read the leading integer of `text`, the way a loose integer cast does.
///
/// Leading whitespace and a sign are accepted; a fraction or exponent right
/// after the digits is applied and then truncated. Text with no leading
/// number is 0 and out-of-range values saturate.
pub fn leading_int(text: &str) -> i64 {
    let text = text.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_start = end;
    end = digits_from(end);
    let mut has_digits = end > int_start;
    let mut is_float = false;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            is_float = true;
            end = frac_end;
        }
    }
    if !has_digits {
        return 0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            is_float = true;
            end = exp_end;
        }
    }

    let number = &text[..end];
    if is_float {
        // Float to int casts saturate.
        return number.parse::<f64>().map_or(0, |v| v as i64);
    }
    number.parse::<i64>().unwrap_or(if number.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// The `timeframe` parameter in seconds. Only an absent parameter falls
/// back to the default; a present one is read with [`leading_int`].
pub fn parse_timeframe(raw: Option<&str>, default: i64) -> i64 {
    raw.map_or(default, leading_int)
}

fn outcome_for(err: &ExporterError) -> ScrapeOutcome {
    match err {
        ExporterError::AuthFailed => ScrapeOutcome::Forbidden,
        _ => ScrapeOutcome::Error,
    }
}

/// The metrics endpoint.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let params = ScrapeParams::from_pairs(pairs);

    match run_scrape(&state, &params).await {
        Ok((body, records)) => {
            let elapsed = started.elapsed().as_secs_f64();
            state.stats.record_success(elapsed, records);
            tracing::info!(records, elapsed_ms = elapsed * 1000.0, "Scrape served");
            Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response())
        }
        Err(err) => {
            state.stats.record_outcome(outcome_for(&err));
            if matches!(err, ExporterError::AuthFailed) {
                tracing::warn!("Rejected scrape with bad token");
            }
            Err(ApiError(err))
        }
    }
}

async fn run_scrape(
    state: &AppState,
    params: &ScrapeParams,
) -> Result<(String, usize), ExporterError> {
    authorize(state.token.as_deref(), params.token.as_deref())?;
    let timeframe = parse_timeframe(params.timeframe.as_deref(), state.default_timeframe);
    let now = chrono::Utc::now().timestamp();

    let output = state.scraper.scrape(now, timeframe).await?;
    Ok((output.body, output.records))
}

/// The exporter's own statistics in prometheus text format.
pub async fn self_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], state.stats.render())
}
