mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use config::Settings;
use routes::maps::AppState;
use services::{MapGenerator, OverpassClient, PaymentsClient, PostgresClient, TerrainClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap_or_default())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration before logging so the [logging] section can apply
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    // Initialize logging; LOG_LEVEL/LOG_FORMAT env vars override the config
    let log_level =
        std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format =
        std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting relief map service...");
    info!("Configuration loaded successfully");

    // Initialize PostgreSQL client
    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let db_min_conn = settings.database.min_connections.unwrap_or(1);

    let postgres = Arc::new(
        PostgresClient::new(&settings.database.url, db_max_conn, db_min_conn)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                panic!("PostgreSQL connection error: {}", e);
            }),
    );

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    // Initialize upstream clients
    let terrain = Arc::new(
        TerrainClient::new(settings.tiles.base_url.clone(), settings.tiles.timeout_secs)
            .unwrap_or_else(|e| panic!("Tile client error: {}", e)),
    );
    info!("Elevation tile client initialized ({})", settings.tiles.base_url);

    let overpass = Arc::new(
        OverpassClient::new(settings.roads.endpoint.clone(), settings.roads.timeout_secs)
            .unwrap_or_else(|e| panic!("Road client error: {}", e)),
    );
    info!("Road client initialized ({})", settings.roads.endpoint);

    let payments = if settings.payments.enabled {
        if settings.payments.secret_key.is_empty() {
            warn!("Payments enabled but no secret key configured; purchases will fail");
        }
        Some(Arc::new(
            PaymentsClient::new(
                settings.payments.base_url.clone(),
                settings.payments.secret_key.clone(),
                settings.payments.timeout_secs,
            )
            .unwrap_or_else(|e| panic!("Payment client error: {}", e)),
        ))
    } else {
        info!("Payments disabled");
        None
    };

    let generator = Arc::new(MapGenerator::new(terrain, overpass));

    // Ensure the output directory exists before serving
    let output_dir = PathBuf::from(&settings.output.dir);
    std::fs::create_dir_all(&output_dir)?;
    info!("Writing generated maps to {}", output_dir.display());

    // Build application state
    let app_state = AppState {
        generator,
        postgres,
        payments,
        output_dir,
        accounts_enabled: settings.accounts.enabled,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
