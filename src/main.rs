use clap::Parser;
use leafclash::adapters::{BroadcastPush, PostgresStore, PushDelivery};
use leafclash::cli::{self, Cli, Commands};
use leafclash::config::AppConfig;
use leafclash::error::{LeafclashError, Result};
use leafclash::scoring;
use leafclash::services::{MatchScheduler, ScoreBroadcaster};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    init_logging(&config);
    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config: {e}");
        }
        return Err(LeafclashError::Validation(errors.join("; ")));
    }

    let store = Arc::new(
        PostgresStore::new(&config.database.url, config.database.max_connections).await?,
    );
    store.migrate().await?;

    match cli.command {
        Commands::Serve => run_serve(store, &config).await,
        Commands::Rescore { team, date, week } => {
            let scope = cli::rescore_scope(date, week.as_deref())?;
            let push = Arc::new(BroadcastPush::new(256));
            let broadcaster = Arc::new(ScoreBroadcaster::new(
                push.clone(),
                config.broadcast.clone(),
            ));
            let scheduler = MatchScheduler::new(
                store,
                broadcaster,
                push as Arc<dyn PushDelivery>,
                config.scheduler.clone(),
            );
            let score = scheduler.rescore_team(team, scope).await?;
            println!("Team {team} {}: {:.2} points", scope, score.grand_total);
            print!("{}", scoring::render_text(&scoring::format(&score.breakdown)));
            Ok(())
        }
        Commands::ScoreAsset { asset, date } => cli::score_asset(&store, asset, date).await,
    }
}

async fn run_serve(store: Arc<PostgresStore>, config: &AppConfig) -> Result<()> {
    let push = Arc::new(BroadcastPush::new(256));
    let broadcaster = Arc::new(ScoreBroadcaster::new(
        push.clone(),
        config.broadcast.clone(),
    ));
    let scheduler = MatchScheduler::new(
        store,
        broadcaster,
        push as Arc<dyn PushDelivery>,
        config.scheduler.clone(),
    );

    scheduler.start();
    info!("leafclash scoring engine running; ctrl-c to stop");

    signal::ctrl_c().await?;
    scheduler.stop();
    scheduler.log_status().await;
    Ok(())
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("info,leafclash={},sqlx=warn", config.logging.level))
    });

    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
