/*
 * Responsibility
 * - Config読み込み → 認証スタック生成 → Router 組み立て
 * - operation ごとの filter binding を起動時に一度だけ解決
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware::{
        self,
        auth::{BindingResolver, BindingTable},
    },
    services::auth::factory::build_auth,
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG=info,authgate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: crash the whole process so we notice immediately
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let app = build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the full application: auth stack, bindings, HTTP layers.
pub async fn build_app(config: &Config) -> Result<Router> {
    let auth = build_auth(config).await?;
    let bindings = BindingResolver::new(Some(auth.filter)).resolve_all(&api::v1::operations());
    let state = AppState::new(auth.caching);

    Ok(middleware::http::apply(
        build_router(state, &bindings),
        config.request_timeout,
    ))
}

pub fn build_router(state: AppState, bindings: &BindingTable) -> Router {
    Router::new()
        .nest("/api/v1", api::v1::routes(bindings))
        .with_state(state)
}
