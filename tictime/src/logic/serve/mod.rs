pub mod api;
pub mod auth;
pub mod database;
pub mod hub;
pub mod socket;
pub mod ticker;
pub mod ui;

use crate::logic::config::ServeConfig;
use crate::logic::serve::api::api_routes;
use crate::logic::serve::auth::Unauthorized;
use crate::logic::serve::database::{cleanup_expired_tokens, init_database, Database};
use crate::logic::serve::hub::TimeHub;
use crate::logic::serve::socket::tic_socket;
use crate::logic::serve::ui::ui_routes;
use daemonize::Daemonize;
use std::net::IpAddr;
use std::time::Duration;
use warp::{Filter, Rejection};

/// How often expired login tokens are swept out of the database
const TOKEN_SWEEP_PERIOD: Duration = Duration::from_secs(3600);

/// Every route the server answers: API, time socket, then the embedded UI.
pub fn routes(
    db: Database,
    hub: TimeHub,
    root_pass: Option<String>,
    session_hours: i64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone + Send + Sync + 'static {
    let api = api_routes(db.clone(), hub.clone(), root_pass, session_hours)
        .or(tic_socket(db, hub))
        .recover(|err: Rejection| async move {
            if err.find::<Unauthorized>().is_some() {
                Ok(warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({ "error": "Unauthorized" })),
                    warp::http::StatusCode::UNAUTHORIZED,
                ))
            } else {
                Err(err)
            }
        })
        .boxed();

    let ui = ui_routes().boxed();

    api.or(ui)
        .with(warp::trace::request())
}

fn resolve_db_file(db_path: &str) -> String {
    let expanded = shellexpand::tilde(db_path).into_owned();
    if expanded.ends_with(".db") || expanded == ":memory:" {
        expanded
    } else {
        format!("{}/tictime.db", expanded.trim_end_matches('/'))
    }
}

pub async fn run(
    host: String,
    port: u16,
    db_path: String,
    daemon: bool,
    root_pass: Option<String>,
    config: ServeConfig,
) -> anyhow::Result<()> {
    // 1) Daemonize if requested
    if daemon {
        Daemonize::new()
            .pid_file("tictime.pid")
            .chown_pid_file(false)
            .working_directory(".")
            .start()?;
    }

    // 2) Initialize SQLite database (expanding ~)
    let db_file = resolve_db_file(&db_path);
    if let Some(parent) = std::path::Path::new(&db_file).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = init_database(&db_file)?;
    tracing::info!(path = %db_file, "account database ready");

    // 3) Start the ticker feeding the time group
    let hub = TimeHub::new(config.channel_capacity);
    tokio::spawn(ticker::run(
        hub.clone(),
        Duration::from_millis(config.tick_ms),
        config.time_format.clone(),
    ));

    // 4) Sweep expired tokens in the background
    {
        let db = db.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TOKEN_SWEEP_PERIOD);
            loop {
                interval.tick().await;
                match cleanup_expired_tokens(&db, chrono::Utc::now()) {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(removed = n, "expired tokens swept"),
                    Err(status) => tracing::warn!(%status, "token sweep failed"),
                }
            }
        });
    }

    // 5) Combine and serve
    let routes = routes(db, hub, root_pass, config.session_hours);
    let ip: IpAddr = host.parse()?;
    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown((ip, port), async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown requested");
    })?;
    tracing::info!("tictime server running on http://{}", addr);
    server.await;
    Ok(())
}
