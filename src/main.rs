use hub_backend::{
    config::{get_config, init_config},
    database::{create_pool, migrate},
    router, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool(&config.database_url).await?;
    migrate(&pool).await?;

    let app_state = AppState::new(pool, config)?;

    {
        let state = app_state.clone();
        let poll_interval = Duration::from_millis(config.queue_poll_interval_ms);
        tokio::spawn(async move {
            let worker = state.worker();
            if let Err(e) = worker.recover_stalled().await {
                tracing::error!(error = ?e, "Stalled job recovery failed");
            }
            loop {
                match worker.run_once(&state).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(poll_interval).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Queue worker error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    let app = router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
