use std::{process, sync::Arc, time::Duration};

use bizdir::{
    application::{
        error::AppError,
        loader::{ExploreLoader, ExploreRepositories, LoaderOptions},
    },
    cache::TransientStore,
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
    },
};
use tokio::{task::JoinHandle, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::FlushCache(_) => run_flush_cache(settings).await,
        config::Command::ExploreUrls(_) => run_explore_urls(settings).await,
        config::Command::Geositemap(_) => run_geositemap(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let db = init_repositories(&settings).await?;
    let explore = build_loader(&settings, db.clone());

    let consumer_handle = explore.spawn_consumer();
    let purge_handle = spawn_transient_purge(db.clone(), settings.explore.cache_ttl);

    let http_state = HttpState {
        explore: explore.clone(),
        db: Some(db.clone()),
    };
    let admin_state = AdminState {
        explore,
        db: Some(db),
    };

    let result = serve_http(&settings, http_state, admin_state).await;

    for handle in [consumer_handle, Some(purge_handle)].into_iter().flatten() {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_flush_cache(settings: config::Settings) -> Result<(), AppError> {
    let db = init_repositories(&settings).await?;
    let explore = build_loader(&settings, db);
    let evicted = explore.invalidate_caches().await;
    info!(evicted, "Explore caches flushed");
    println!("evicted {evicted} explore cache entries");
    Ok(())
}

async fn run_explore_urls(settings: config::Settings) -> Result<(), AppError> {
    let db = init_repositories(&settings).await?;
    let explore = build_loader(&settings, db);
    let entries = explore
        .sitemap()
        .get_explore_urls()
        .await
        .map_err(AppError::from)?;
    for entry in entries {
        if entry.lastmod.is_empty() {
            println!("{}", entry.loc);
        } else {
            println!("{}\t{}", entry.loc, entry.lastmod);
        }
    }
    Ok(())
}

async fn run_geositemap(settings: config::Settings) -> Result<(), AppError> {
    let db = init_repositories(&settings).await?;
    let explore = build_loader(&settings, db);
    let xml = explore
        .sitemap()
        .generate_geositemap()
        .await
        .map_err(AppError::from)?;
    print!("{xml}");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_loader(settings: &config::Settings, db: Arc<PostgresRepositories>) -> ExploreLoader {
    let transients: Arc<dyn TransientStore> = Arc::new(db.transient_store());
    let repos = ExploreRepositories::uniform(db).with_transients(transients);
    ExploreLoader::new(LoaderOptions::from(settings), repos)
}

/// Delete expired transient rows once per TTL period.
fn spawn_transient_purge(db: Arc<PostgresRepositories>, period: Duration) -> JoinHandle<()> {
    let store = db.transient_store();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(purged) if purged > 0 => info!(purged, "Expired transients purged"),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Transient purge failed"),
            }
        }
    })
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace));

    try_join!(
        async { public_server.await },
        async { admin_server.await }
    )
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Resolves on Ctrl-C, then gives in-flight requests `grace` before forcing exit.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(grace_secs = grace.as_secs(), "Shutdown requested");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("Graceful shutdown window elapsed; exiting");
        process::exit(0);
    });
}
