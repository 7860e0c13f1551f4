use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use dotenvy;
use env_logger::Env;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod docx;
pub mod fetch;
pub mod invoice;

use crate::config::GeneratorConfig;
use crate::fetch::{HttpFetcher, ResourceFetcher};
use crate::invoice::generator::InvoiceGenerator;
use crate::invoice::handlers::TEMPLATE_SOURCE_HEADER;

/// Shared application state: the resource URLs plus the fetcher used to
/// download the template and images.
#[derive(Clone)]
pub struct AppState {
    pub config: GeneratorConfig,
    pub fetcher: Arc<dyn ResourceFetcher + Send + Sync>,
}

impl AppState {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_fetcher(config, Arc::new(HttpFetcher::new()))
    }

    /// State with a custom fetcher, used by the tests to avoid network
    /// access.
    pub fn with_fetcher(
        config: GeneratorConfig,
        fetcher: Arc<dyn ResourceFetcher + Send + Sync>,
    ) -> Self {
        Self { config, fetcher }
    }

    pub fn generator(&self) -> InvoiceGenerator {
        InvoiceGenerator::new(self.config.clone(), self.fetcher.clone())
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// CORS policy for the invoice endpoint. Any origin may POST and read the
/// download headers back; the endpoint is meant to be called straight
/// from browser frontends.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec!["POST", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![header::CONTENT_DISPOSITION.as_str(), TEMPLATE_SOURCE_HEADER])
        .max_age(3600)
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    #[derive(OpenApi)]
    #[openapi(
        paths(crate::invoice::handlers::generate_invoice),
        components(
            schemas(
                invoice::models::InvoiceRequest,
                invoice::models::LineItem,
                ErrorResponse,
            )
        ),
        tags(
            (name = "Invoice", description = "Invoice document generation endpoints.")
        )
    )]
    struct ApiDoc;

    dotenvy::dotenv().ok(); // Load .env file
    let generator_config = GeneratorConfig::from_env();
    if generator_config.template_url.is_none() {
        log::info!("INVOICE_TEMPLATE_URL is not set, the embedded layout will be used");
    }
    let app_state = web::Data::new(AppState::new(generator_config));

    let prometheus = PrometheusMetricsBuilder::new("invoice_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    let port = config::server_port();
    log::info!("Starting server at http://0.0.0.0:{port}");

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors())
            .app_data(app_state)
            .service(web::scope("/api").configure(invoice::handlers::config))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .backlog(8192)
    .max_connections(25000)
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
