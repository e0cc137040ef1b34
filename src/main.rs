use mr_refresh::git::InMemoryCommitGraph;
use mr_refresh::server::{AppState, build_router};
use mr_refresh::store::InMemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mr_refresh=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let hook_secret =
        std::env::var("MR_REFRESH_HOOK_SECRET").expect("MR_REFRESH_HOOK_SECRET must be set");
    let bind_addr = std::env::var("MR_REFRESH_BIND").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let state = AppState::new(
        InMemoryStore::new(),
        InMemoryCommitGraph::new(),
        hook_secret.into_bytes(),
    );
    let app = build_router(state);

    tracing::info!("listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
