use std::{process, sync::Arc};

use solar_sentinel::{
    application::{error::AppError, forecast::ForecastService},
    cache::{CacheSweeper, ForecastStore},
    config,
    infra::{
        assets::PublicAssets,
        error::InfraError,
        http::{self, HttpState, RequestValidator},
        telemetry,
        upstream::OpenMeteoClient,
    },
};
use tokio_util::sync::CancellationToken;
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = Arc::new(ForecastStore::new());
    let client = OpenMeteoClient::new(
        settings.upstream.base_url.clone(),
        settings.upstream.timeout,
    )?;
    let forecast = Arc::new(
        ForecastService::new(Arc::new(client), Arc::clone(&store))
            .with_refresh_after(settings.cache.refresh_after),
    );

    let shutdown = CancellationToken::new();
    let sweeper = CacheSweeper::new(Arc::clone(&store), settings.cache.sweep_interval)
        .spawn(shutdown.clone());

    let state = HttpState {
        forecast: Arc::clone(&forecast),
        validator: RequestValidator::new(
            settings.forecast.default_location,
            settings.forecast.horizon_days,
        ),
        assets: PublicAssets::new(settings.assets.public_dir.clone()),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "solar_sentinel::serve",
        addr = %settings.server.addr,
        upstream = %settings.upstream.base_url,
        public_dir = %settings.assets.public_dir.display(),
        "forecast server listening"
    );

    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    shutdown.cancel();
    if let Err(err) = sweeper.await {
        warn!(
            target = "solar_sentinel::serve",
            error = %err,
            "cache sweeper task ended abnormally"
        );
    }

    if tokio::time::timeout(settings.server.graceful_shutdown, forecast.shutdown())
        .await
        .is_err()
    {
        warn!(
            target = "solar_sentinel::serve",
            timeout_secs = settings.server.graceful_shutdown.as_secs(),
            "background refreshes still running at shutdown deadline"
        );
    }

    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "solar_sentinel::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "solar_sentinel::serve", "shutdown signal received");
}
