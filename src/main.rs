use contestboard::orchestration::{Broadcaster, ChannelBroadcaster};
use contestboard::{api, config::Config, db::init_db, LeaderboardService, Repository, Stores};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let channel = ChannelBroadcaster::new(config.broadcast_buffer);
    let mut updates = channel.subscribe();
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(channel);

    let (service, worker) = LeaderboardService::start(
        Stores::shared(repo),
        config.pipeline_settings(),
        broadcaster,
        config.dispatch_queue_capacity,
    );

    // Stand-in consumer until a push transport subscribes.
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => tracing::info!(
                    contest_id = %update.contest_id,
                    update_type = %update.update_type,
                    changes = update.rank_changes.len(),
                    "leaderboard update"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "update consumer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let port = config.port;
    let app = api::create_router(api::AppState::new(Arc::new(service), config));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }

    worker.abort();
}
