use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::actors::extract_actors;
use crate::aggregator::Aggregator;
use crate::ingest::types::{CrisisEvent, FetchOptions};
use crate::markets::MarketService;
use crate::regions::{matches_region, Region};
use crate::translate::{Locale, TranslationService};

pub const EVENTS_CACHE_CONTROL: &str = "public, s-maxage=30, stale-while-revalidate=10";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub markets: Arc<MarketService>,
    pub translator: Arc<TranslationService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/events", get(events))
        .route("/api/actors", get(actors))
        .route("/api/indicators", get(indicators))
        .route("/api/markets", get(markets))
        .route("/api/sources", get(sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `{success, data}` / `{success, error}` envelope.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope {
        success: true,
        data: Some(data),
        error: None,
    })
    .into_response()
}

fn bad_request(msg: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(Envelope::<()> {
            success: false,
            data: None,
            error: Some(msg.into()),
        }),
    )
        .into_response()
}

/// Raw strings so that malformed values get our envelope, not axum's rejection.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    q: Option<String>,
    since: Option<String>,
    limit: Option<String>,
    locale: Option<String>,
    region: Option<String>,
}

/// Validated `/api/events` parameters.
#[derive(Debug, PartialEq)]
struct EventsRequest {
    options: FetchOptions,
    locale: Option<Locale>,
    region: Region,
}

fn parse_since(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl EventsQuery {
    fn validate(&self) -> Result<EventsRequest, String> {
        let since = match non_empty(&self.since) {
            Some(raw) => Some(parse_since(raw).ok_or_else(|| format!("invalid `since`: {raw}"))?),
            None => None,
        };
        let limit = match non_empty(&self.limit) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => return Err(format!("invalid `limit`: {raw}")),
            },
            None => None,
        };
        let locale = match non_empty(&self.locale) {
            None | Some("en") => None,
            Some(raw) => Some(raw.parse::<Locale>().map_err(|e| e.to_string())?),
        };
        let region = non_empty(&self.region)
            .unwrap_or("all")
            .parse::<Region>()
            .map_err(|e| e.to_string())?;

        Ok(EventsRequest {
            options: FetchOptions {
                query: non_empty(&self.q).map(str::to_string),
                since,
                limit,
            },
            locale,
            region,
        })
    }
}

async fn events(State(state): State<AppState>, Query(q): Query<EventsQuery>) -> Response {
    let req = match q.validate() {
        Ok(r) => r,
        Err(msg) => return bad_request(msg),
    };

    let all = state.aggregator.fetch_all_events(&req.options).await;
    let mut out: Vec<CrisisEvent> = all
        .iter()
        .filter(|ev| {
            let country = ev.location.as_ref().and_then(|l| l.country.as_deref());
            matches_region(req.region, &ev.search_text(), country)
        })
        .cloned()
        .collect();

    if let Some(locale) = req.locale {
        out = state.translator.translate_events(&out, locale).await;
    }

    let mut resp = ok(out);
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(EVENTS_CACHE_CONTROL),
    );
    resp
}

async fn actors(State(state): State<AppState>) -> Response {
    let all = state
        .aggregator
        .fetch_all_events(&FetchOptions::default())
        .await;
    ok(extract_actors(&all))
}

async fn indicators(State(state): State<AppState>) -> Response {
    let list = state.markets.indicators().await;
    ok(list.as_ref())
}

async fn markets(State(state): State<AppState>) -> Response {
    let list = state.markets.contracts().await;
    ok(list.as_ref())
}

async fn sources(State(state): State<AppState>) -> Response {
    ok(state.aggregator.health_report().await)
}
