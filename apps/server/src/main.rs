#![warn(clippy::all, clippy::pedantic)]

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use navwatch::pool::open_pool;
use navwatch::{
    BruteForceGuard, Config, EventStore, HttpProber, LibsqlEventStore, LinkHealthMonitor,
    LinkScheduler, LoginPolicy, initialize_database,
};
use tracing::{info, warn};

mod auth;
mod captcha;
mod error;
mod ratelimit;
mod routes;
mod state;

use captcha::CaptchaVerifier;
use error::AppError;
use ratelimit::{RateLimiter, STATUS_CHECKS_PER_MINUTE};
use logger::init_tracing;
use state::AppState;

#[derive(Parser)]
#[command(name = "navwatch-server", version, about = "Navigation link directory with login guard and link health monitor")]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/navwatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run one health cycle, print its summary and exit
    #[arg(long)]
    check_once: bool,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let mut config = Config::from_config(args.config.as_deref())?;
    config.apply_env_overrides()?;
    config.validate()?;
    info!("{config}");

    let state = build_state(&config).await?;
    if state.captcha.is_enabled() {
        info!(provider = ?state.captcha.provider(), "Captcha verification enabled");
    }

    if args.check_once {
        let summary = state.scheduler.trigger_now().await.map_err(anyhow::Error::from)?;
        info!(attempted = summary.attempted, failed_writes = summary.failed_writes, "Check finished");
        return Ok(());
    }

    if let Some(password) = auth::ensure_admin(state.store.as_ref()).await? {
        warn!(username = "admin", password = %password, "Initial admin password, shown once; change it");
    }

    state.scheduler.start();

    let addr = bind_addr(&config.server)?;
    run_server(addr, state).await
}

/// Listen address from config; IPv6 binds such as `::` need no brackets.
fn bind_addr(server: &navwatch::config::Server) -> Result<SocketAddr, AddrParseError> {
    Ok(SocketAddr::new(server.bind.parse()?, server.port))
}

async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let pool = open_pool(&config.database.path, config.database.max_connections).await?;
    {
        let conn = pool.get().await.map_err(|e| anyhow::anyhow!("database connection: {e}"))?;
        initialize_database(&conn).await?;
    }

    let store: Arc<dyn EventStore> = Arc::new(LibsqlEventStore::new_from_pool(pool));
    let guard = Arc::new(BruteForceGuard::new(store.clone(), LoginPolicy::from(&config.login)));

    let prober = Arc::new(HttpProber::new()?);
    let monitor = Arc::new(LinkHealthMonitor::new(store.clone(), prober, config.monitor.status_timeout()));
    let scheduler = Arc::new(LinkScheduler::new(monitor, config.monitor.check_interval()));

    Ok(AppState {
        store,
        guard,
        scheduler,
        captcha: CaptchaVerifier::from_settings(&config.captcha)?,
        admin_token: config.admin.token.clone(),
        status_limiter: Arc::new(RateLimiter::per_minute(STATUS_CHECKS_PER_MINUTE)),
    })
}

async fn run_server(addr: SocketAddr, state: AppState) -> Result<(), AppError> {
    let scheduler = state.scheduler.clone();
    let data = web::Data::new(state);

    info!(%addr, "Starting HTTP server");
    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    scheduler.stop();
    Ok(())
}
