//! HTTP server for the merge request refresh engine.
//!
//! This module implements the HTTP server that:
//! - Accepts post-receive deliveries from the git server, validates their
//!   signatures, and runs the refresh pipeline
//! - Provides merge request inspection endpoints for observability
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /api/v1/post-receive` - Accepts a signed ref update and returns
//!   the refresh summary
//! - `GET /api/v1/merge-requests/{id}` - Returns a merge request and its
//!   system notes as JSON
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

pub mod health;
pub mod merge_request;
pub mod post_receive;
pub mod signature;

pub use health::health_handler;
pub use merge_request::merge_request_handler;
pub use post_receive::post_receive_handler;

use crate::git::InMemoryCommitGraph;
use crate::hooks::LoggingHooks;
use crate::refresh::RefreshService;
use crate::store::InMemoryStore;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor. A clone is
/// cheap; every clone shares the same store and commit graph.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The refresh engine driven by the post-receive endpoint.
    service: RefreshService<InMemoryStore, InMemoryCommitGraph, LoggingHooks>,

    /// Handle on the same store the service writes to, for the read-only
    /// inspection endpoints.
    store: InMemoryStore,

    /// Secret for HMAC-SHA256 signature verification of deliveries.
    hook_secret: Vec<u8>,
}

impl AppState {
    /// Creates a new `AppState` over the given store and commit graph.
    pub fn new(
        store: InMemoryStore,
        graph: InMemoryCommitGraph,
        hook_secret: impl Into<Vec<u8>>,
    ) -> Self {
        let service = RefreshService::new(store.clone(), graph, LoggingHooks);
        AppState {
            inner: Arc::new(AppStateInner {
                service,
                store,
                hook_secret: hook_secret.into(),
            }),
        }
    }

    /// Returns the refresh service.
    pub fn service(&self) -> &RefreshService<InMemoryStore, InMemoryCommitGraph, LoggingHooks> {
        &self.inner.service
    }

    /// Returns the backing store.
    pub fn store(&self) -> &InMemoryStore {
        &self.inner.store
    }

    /// Returns the hook secret.
    pub fn hook_secret(&self) -> &[u8] {
        &self.inner.hook_secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/api/v1/post-receive", post(post_receive_handler))
        .route("/api/v1/merge-requests/{id}", get(merge_request_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
