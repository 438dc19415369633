//! HTTP routing for the listing endpoints.
//!
//! Routes:
//! - `GET /cli-list`: flat listing of the root
//! - `GET /tree?path=<rel>`: recursive plain-text listing
//! - `GET /update`: source refresh, only when enabled
//! - `GET /` and `GET /*path`: negotiated index of a directory
//!
//! Listing work is blocking filesystem I/O and runs on the blocking pool;
//! every request gets its own task and shares only the immutable state.

use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use listing::render::{directory_location, TEXT_HTML};
use listing::{ClientMode, ListingError};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::handler::{Endpoint, ListingResponse, RequestHandler};
use crate::update::{render_refresh_page, token_matches, SourceRefresher, UPDATE_TOKEN_HEADER};

/// Shared, read-only state for all requests.
#[derive(Debug)]
pub struct AppState {
    handler: RequestHandler,
    update: Option<UpdateState>,
}

#[derive(Debug)]
struct UpdateState {
    refresher: SourceRefresher,
    token: String,
}

impl AppState {
    /// State serving listings only.
    pub fn new(handler: RequestHandler) -> Self {
        Self {
            handler,
            update: None,
        }
    }

    /// Enable the `/update` route.
    pub fn with_update(mut self, refresher: SourceRefresher, token: impl Into<String>) -> Self {
        self.update = Some(UpdateState {
            refresher,
            token: token.into(),
        });
        self
    }

    /// Build state from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let handler = RequestHandler::from_config(config).with_context(|| {
            format!("Failed to open root directory: {}", config.server.root.display())
        })?;

        let state = Self::new(handler);
        if config.update.enabled {
            let refresher = SourceRefresher::new(config.update_repo_dir());
            return Ok(state.with_update(refresher, config.update.token.clone()));
        }
        Ok(state)
    }

    /// The listing handler.
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }
}

#[derive(Debug, Deserialize)]
struct TreeParams {
    path: Option<String>,
}

/// Build the router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/cli-list", get(cli_list))
        .route("/tree", get(tree))
        .route("/", get(index_root))
        .route("/*path", get(index_path));

    if state.update.is_some() {
        router = router.route("/update", get(update_sources));
    }

    router.with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!(
        %addr,
        root = %state.handler.resolver().root().display(),
        update = state.update.is_some(),
        "Serving directory index"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Run a listing on the blocking pool.
async fn run_listing(
    state: Arc<AppState>,
    endpoint: Endpoint,
    requested: Option<String>,
    identity: Option<String>,
) -> Response {
    let mode = state.handler.response_mode(endpoint, identity.as_deref());
    let handler_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        handler_state
            .handler
            .handle_with_mode(endpoint, requested.as_deref(), mode)
    })
    .await;

    match result {
        Ok(response) => listing_response(response),
        Err(err) => {
            error!(error = %err, endpoint = endpoint.name(), "Listing task failed");
            listing_response(task_failure(&state, err, mode))
        }
    }
}

/// A listing task that died is reported as a read failure of the root.
fn task_failure(state: &AppState, err: JoinError, mode: ClientMode) -> ListingResponse {
    let error = ListingError::Read {
        path: state.handler.resolver().root().to_path_buf(),
        source: io::Error::other(err.to_string()),
    };
    ListingResponse::from_error(&error, mode)
}

fn listing_response(response: ListingResponse) -> Response {
    (
        response.status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}

fn error_response(error: &ListingError, mode: ClientMode) -> Response {
    listing_response(ListingResponse::from_error(error, mode))
}

async fn cli_list(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    run_listing(state, Endpoint::CliList, None, user_agent(&headers)).await
}

async fn tree(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TreeParams>,
    headers: HeaderMap,
) -> Response {
    run_listing(state, Endpoint::Tree, params.path, user_agent(&headers)).await
}

async fn index_root(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    run_listing(state, Endpoint::Index, None, user_agent(&headers)).await
}

async fn index_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    // Relative links only resolve against a slash-terminated URL. The raw
    // path may start with `//`, so the location is rebuilt from the
    // resolved directory.
    if !uri.path().ends_with('/') {
        let check = Arc::clone(&state);
        let requested = path.clone();
        let location = tokio::task::spawn_blocking(move || {
            check
                .handler
                .resolve_listable(&requested)
                .ok()
                .map(|dir| directory_location(dir.relative()))
        })
        .await
        .ok()
        .flatten();

        if let Some(location) = location {
            let location = match uri.query() {
                Some(query) => format!("{location}?{query}"),
                None => location,
            };
            return Redirect::permanent(&location).into_response();
        }
    }

    run_listing(state, Endpoint::Index, Some(path), user_agent(&headers)).await
}

async fn update_sources(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let mode = state
        .handler
        .classify(user_agent(&headers).as_deref());

    let Some(update) = state.update.as_ref() else {
        return error_response(&ListingError::not_found("update"), mode);
    };

    let provided = headers
        .get(UPDATE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if !token_matches(&update.token, provided) {
        warn!("Rejected source refresh with missing or wrong token");
        return error_response(&ListingError::not_found("update"), mode);
    }

    match update.refresher.refresh().await {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_HTML)],
            render_refresh_page(&output),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Source refresh failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, TEXT_HTML)],
                "<!DOCTYPE html><html><body><h1>500 - Server Error</h1></body></html>\n",
            )
                .into_response()
        }
    }
}
