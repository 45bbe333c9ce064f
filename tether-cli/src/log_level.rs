use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use dashmap::DashMap;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Registry, reload};

pub const LOG_LEVEL_PATH: &str = "/log-level";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogLevelError {
    #[error("Missing query parameter: {0}")]
    Missing(&'static str),
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
    #[error("Invalid level: {0}")]
    InvalidLevel(String),
    #[error("Filter rejected: {0}")]
    Filter(String),
    #[error("Subscriber is gone: {0}")]
    Reload(String),
}

impl IntoResponse for LogLevelError {
    fn into_response(self) -> Response {
        let status = match self {
            LogLevelError::Reload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LogLevelQuery {
    target: Option<String>,
    level: Option<String>,
}

/// Runtime overrides layered on top of the startup filter.
pub struct LogControl {
    base: String,
    overrides: DashMap<String, LevelFilter>,
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogControl {
    pub fn new(base: String, handle: reload::Handle<EnvFilter, Registry>) -> Self {
        Self {
            base,
            overrides: DashMap::new(),
            handle,
        }
    }

    /// Sets `target` to `level`, replacing an earlier override of the same target.
    pub fn apply(&self, target: &str, level: LevelFilter) -> Result<(), LogLevelError> {
        let mut overrides: Vec<(String, LevelFilter)> = self
            .overrides
            .iter()
            .filter(|entry| entry.key() != target)
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        overrides.push((target.to_owned(), level));

        let filter = EnvFilter::try_new(render_directives(&self.base, &overrides))
            .map_err(|e| LogLevelError::Filter(e.to_string()))?;
        self.handle
            .reload(filter)
            .map_err(|e| LogLevelError::Reload(e.to_string()))?;

        self.overrides.insert(target.to_owned(), level);
        Ok(())
    }
}

pub fn log_level_router(control: Arc<LogControl>) -> Router {
    Router::new()
        .route(LOG_LEVEL_PATH, get(set_log_level))
        .with_state(control)
}

async fn set_log_level(
    State(control): State<Arc<LogControl>>,
    Query(query): Query<LogLevelQuery>,
) -> Result<&'static str, LogLevelError> {
    let (target, level) = parse_request(&query).inspect_err(|e| {
        warn!("Log level change refused: {}", e);
    })?;

    control.apply(&target, level)?;
    info!(module = %target, level = %level, "Log level changed");
    Ok("OK")
}

fn parse_request(query: &LogLevelQuery) -> Result<(String, LevelFilter), LogLevelError> {
    let target = query
        .target
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(LogLevelError::Missing("target"))?;
    let level = query
        .level
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(LogLevelError::Missing("level"))?;

    let valid_target = target
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':'));
    if !valid_target {
        return Err(LogLevelError::InvalidTarget(target.to_owned()));
    }

    let level =
        LevelFilter::from_str(level).map_err(|_| LogLevelError::InvalidLevel(level.to_owned()))?;

    Ok((target.to_owned(), level))
}

fn render_directives(base: &str, overrides: &[(String, LevelFilter)]) -> String {
    let mut directives: Vec<String> = base
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_owned)
        .collect();
    directives.extend(
        overrides
            .iter()
            .map(|(target, level)| format!("{target}={}", level.to_string().to_lowercase())),
    );
    directives.join(",")
}
