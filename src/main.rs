use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use visadesk::config::AppConfig;
use visadesk::error::AppError;
use visadesk::telemetry;
use visadesk::workflows::intake::{
    cooldown, intake_router, ClientAccount, ClientId, InMemoryClientRepository, IntakeService,
    TracingDispatcher,
};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "visadesk",
    about = "Client intake and application tracking for an immigration consulting practice",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the rejection cooldown for a given rejection timestamp
    Cooldown(CooldownArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Seed a demo client as ID:EMAIL:NAME (repeatable)
    #[arg(long = "seed-client", value_parser = parse_seed_client)]
    seed_clients: Vec<SeedClient>,
}

#[derive(Args, Debug)]
struct CooldownArgs {
    /// Rejection timestamp (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    rejected_at: DateTime<Utc>,
    /// Evaluation instant (defaults to the current time)
    #[arg(long, value_parser = parse_timestamp)]
    now: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct SeedClient {
    id: String,
    email: String,
    name: String,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Cooldown(args) => run_cooldown(args),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as RFC 3339 ({err})"))
}

fn parse_seed_client(raw: &str) -> Result<SeedClient, String> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(email), Some(name))
            if !id.trim().is_empty() && !email.trim().is_empty() && !name.trim().is_empty() =>
        {
            Ok(SeedClient {
                id: id.trim().to_string(),
                email: email.trim().to_string(),
                name: name.trim().to_string(),
            })
        }
        _ => Err(format!("'{raw}' is not of the form ID:EMAIL:NAME")),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let repository = Arc::new(InMemoryClientRepository::default());
    for seed in &args.seed_clients {
        let account = ClientAccount::new(
            ClientId(seed.id.clone()),
            &seed.email,
            &seed.name,
            "unset",
        );
        match repository.register(account) {
            Ok(()) => info!(client = %seed.id, "seeded demo client"),
            Err(err) => info!(client = %seed.id, error = %err, "skipped demo client"),
        }
    }

    let intake = Arc::new(IntakeService::new(
        repository,
        Arc::new(TracingDispatcher),
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(intake_router(intake))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, poll_secs = config.polling.status_poll_secs, "intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_cooldown(args: CooldownArgs) -> Result<(), AppError> {
    let now = args.now.unwrap_or_else(Utc::now);
    let window = cooldown::evaluate(Some(args.rejected_at), now, cooldown::rejection_cooldown());

    if window.eligible {
        println!("cooldown elapsed; resubmission is allowed");
    } else {
        println!(
            "resubmission blocked for another {}h {:02}m",
            window.remaining_hours(),
            window.remaining_minutes()
        );
    }
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.render();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
