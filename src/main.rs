use std::net::SocketAddr;
use std::time::Duration;

use exam_session_engine::{
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    middleware::cors::cors_layer,
    router, AppState,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SWEEP_BATCH_SIZE: i64 = 200;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let pool = create_pool().await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool)?;

    if config.expiry_sweep_interval_secs > 0 {
        let state = app_state.clone();
        let interval = Duration::from_secs(config.expiry_sweep_interval_secs);
        tokio::spawn(async move {
            loop {
                match state
                    .session_service
                    .expire_overdue_sessions(SWEEP_BATCH_SIZE)
                    .await
                {
                    Ok(0) => {}
                    Ok(n) => info!(sessions = n, "Expired overdue sessions"),
                    Err(e) => tracing::error!(error = ?e, "Expiry sweep error"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = router(app_state, config.student_rps)
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
