// Media functions server

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use content_planner::{app_state::AppState, config::Config, media_interface::create_media_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("content_planner=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config.clone()).await?;

    let app = create_media_router(app_state.media.clone()).layer(TraceLayer::new_for_http());

    let addr = config.server_address();
    info!("media functions listening on http://{}", addr);
    info!("  POST /functions/v1/generate-upload-url");
    info!("  POST /functions/v1/delete-file");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
