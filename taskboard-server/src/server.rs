//! Shared application state, router assembly, and server startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{AllowList, Authorizer};
use crate::config::ServerConfig;
use crate::relay::RelayState;
use crate::routes;
use crate::store::TaskStore;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Filesystem task store.
    pub store: Arc<TaskStore>,
    /// Live-update relay and connection registry.
    pub relay: Arc<RelayState>,
    /// Gate for archive moves and notes clearing.
    pub authorizer: Arc<dyn Authorizer>,
    /// Whether `X-Forwarded-For` identifies the caller.
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// State with a loopback-only allow-list and a default relay.
    #[must_use]
    pub fn new(store: TaskStore) -> Self {
        Self {
            store: Arc::new(store),
            relay: Arc::new(RelayState::new()),
            authorizer: Arc::new(AllowList::loopback()),
            trust_forwarded_for: true,
        }
    }

    /// Builds the state described by a resolved configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            store: Arc::new(TaskStore::from_config(config)),
            relay: Arc::new(RelayState::with_max_frame_size(config.max_frame_size)),
            authorizer: Arc::new(AllowList::new(config.allowed_ips.iter().copied())),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// Replaces the authorizer.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Sets whether `X-Forwarded-For` is trusted.
    #[must_use]
    pub const fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}

/// Router-level settings that are not part of handler state.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Directory served for paths no route matches.
    pub public_dir: Option<PathBuf>,
    /// Request body limit for uploads; axum's default when unset.
    pub max_upload_size: Option<usize>,
}

impl RouterOptions {
    /// Options taken from a resolved configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            public_dir: Some(config.public_dir.clone()),
            max_upload_size: Some(config.max_upload_size),
        }
    }
}

/// Assembles the full application router.
pub fn build_router(state: AppState, options: &RouterOptions) -> Router {
    let mut router = routes::routes();
    if let Some(limit) = options.max_upload_size {
        router = router.layer(DefaultBodyLimit::max(limit));
    }
    if let Some(dir) = &options.public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Binds `addr` and serves the application in a background task.
///
/// Returns the bound address (useful with port 0) and the server task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
    state: AppState,
    options: &RouterOptions,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
    let app = build_router(state, options);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}
