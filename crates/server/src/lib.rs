//! # DirIndex Daemon Library
//!
//! This crate serves one directory subtree over HTTP as a listing that is
//! plain text for command-line fetchers and HTML for browsers.
//!
//! ## Overview
//!
//! - **Request handling**: classify the client, resolve the path, enumerate,
//!   render, and map every outcome to a status and content type
//! - **Routing**: `axum` routes for the flat, recursive and negotiated
//!   listings
//! - **Source refresh**: token-gated `git status` + `git pull`
//! - **Configuration**: TOML file, environment and CLI overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use server::{AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     config.validate()?;
//!
//!     let state = Arc::new(AppState::from_config(&config)?);
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()?).await?;
//!     server::router::serve(listener, state, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`handler`]: Per-request orchestration over the listing engine
//! - [`router`]: HTTP routes and server loop
//! - [`update`]: Source refresh trigger

pub mod config;
pub mod handler;
pub mod router;
pub mod update;

// Re-export the engine for convenience
pub use listing;

pub use config::Config;
pub use handler::{Endpoint, ListingResponse, RequestHandler, RESERVED_NAMES};
pub use router::{build_router, AppState};
pub use update::{RefreshOutput, SourceRefresher, UpdateError};
