//! HTTP layer tests: status codes, error bodies, CORS and download
//! headers. The fetcher is stubbed so no test touches the network.

use std::sync::Arc;

use actix_web::http::{header, Method, StatusCode};
use actix_web::{test, web, App};
use marketix_invoice_server::config::GeneratorConfig;
use marketix_invoice_server::docx::DOCX_MIME;
use marketix_invoice_server::fetch::{FetchError, ResourceFetcher};
use marketix_invoice_server::invoice::handlers;
use marketix_invoice_server::{cors, AppState};
use serde_json::json;

/// Every download fails, which forces the embedded layout and exercises
/// the skip paths.
struct NoNetworkFetcher;

#[async_trait::async_trait]
impl ResourceFetcher for NoNetworkFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Status(reqwest::StatusCode::NOT_FOUND))
    }
}

fn test_state() -> web::Data<AppState> {
    web::Data::new(AppState::with_fetcher(
        GeneratorConfig::default(),
        Arc::new(NoNetworkFetcher),
    ))
}

fn minimal_payload() -> serde_json::Value {
    json!({
        "client_info": { "{{client_name}}": "PT Maju Jaya" },
        "invoice_details": { "{{invoice_number}}": "INV-042" },
        "financials": { "[subtotal]": "Rp 1.000.000", "[grandtotal]": "Rp 1.000.000" },
        "invoice_number": "INV-042",
        "items": [
            {
                "description": "Design",
                "unit_price": 1_000_000.0,
                "quantity": 1.0,
                "total": 1_000_000.0
            }
        ]
    })
}

macro_rules! invoice_app {
    () => {
        test::init_service(
            App::new()
                .wrap(cors())
                .app_data(test_state())
                .service(web::scope("/api").configure(handlers::config)),
        )
        .await
    };
}

/// Test a valid request returns a DOCX download.
#[actix_web::test]
async fn test_valid_request_returns_docx() {
    let app = invoice_app!();

    let req = test::TestRequest::post()
        .uri("/api/invoice")
        .set_json(minimal_payload())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        DOCX_MIME
    );
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("Invoice_INV-042_PT_Maju_Jaya.docx"));
    assert_eq!(
        resp.headers().get(handlers::TEMPLATE_SOURCE_HEADER).unwrap(),
        "embedded"
    );

    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"PK"), "body is a ZIP archive");
}

/// Test the original route name still works.
#[actix_web::test]
async fn test_compat_route_generates_too() {
    let app = invoice_app!();

    let req = test::TestRequest::post()
        .uri("/api/generate-invoice")
        .set_json(minimal_payload())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        DOCX_MIME
    );
}

/// Test broken JSON gets the fixed error message clients match on.
#[actix_web::test]
async fn test_malformed_json_is_rejected() {
    let app = invoice_app!();

    let req = test::TestRequest::post()
        .uri("/api/invoice")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{ this is not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid JSON in request body");
}

/// Test a payload without items names the missing section.
#[actix_web::test]
async fn test_missing_items_reports_the_field() {
    let app = invoice_app!();

    let payload = json!({
        "client_info": { "{{client_name}}": "PT Maju Jaya" },
        "invoice_details": { "{{invoice_number}}": "INV-042" },
        "financials": { "[subtotal]": "Rp 1.000.000" }
    });
    let req = test::TestRequest::post()
        .uri("/api/invoice")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing required field: items");
}

/// Test valid JSON of the wrong shape is a 400, not a 500.
#[actix_web::test]
async fn test_wrong_shape_reports_payload_error() {
    let app = invoice_app!();

    let payload = json!({
        "client_info": {},
        "invoice_details": {},
        "financials": {},
        "items": { "not": "a list" }
    });
    let req = test::TestRequest::post()
        .uri("/api/invoice")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let message = body["error"].as_str().unwrap();
    assert!(
        message.starts_with("Invalid request payload:"),
        "unexpected message: {message}"
    );
}

/// Test unsupported methods answer 405 with the JSON error body.
#[actix_web::test]
async fn test_get_is_method_not_allowed() {
    let app = invoice_app!();

    let req = test::TestRequest::get().uri("/api/invoice").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Method not allowed");
}

/// Test a plain OPTIONS probe without preflight headers is a 200.
#[actix_web::test]
async fn test_plain_options_returns_ok() {
    let app = invoice_app!();

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/invoice")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
}

/// Test a browser preflight is answered with the wildcard origin.
#[actix_web::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = invoice_app!();

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/invoice")
        .insert_header((header::ORIGIN, "https://app.example.com"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

/// Test a paid request with unreachable artwork still downloads, named as
/// paid.
#[actix_web::test]
async fn test_paid_request_survives_missing_artwork() {
    let app = invoice_app!();

    let mut payload = minimal_payload();
    payload["mark_as_paid"] = json!(true);
    let req = test::TestRequest::post()
        .uri("/api/invoice")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("Paid_Invoice_INV-042_PT_Maju_Jaya.docx"));
}
