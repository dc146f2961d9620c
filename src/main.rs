use std::env;

use anyhow::Context;
use tokio::net::TcpListener;

use lyra_backend::core::logging;
use lyra_backend::server::router::router;
use lyra_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    logging::init(&state.paths);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8000);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("LYRA_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router(state))
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
