use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::http::Method;
use actix_web::{web, HttpResponse, Responder};
use log;

use crate::docx::DOCX_MIME;
use crate::invoice::models::InvoiceRequest;
use crate::{AppState, ErrorResponse};

/// Response header naming where the template came from, `remote` or
/// `embedded`.
pub const TEMPLATE_SOURCE_HEADER: &str = "X-Template-Source";

#[utoipa::path(
    post,
    path = "/api/invoice",
    tag = "Invoice",
    request_body = InvoiceRequest,
    responses(
        (status = 200, description = "Rendered DOCX invoice", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 400, description = "Malformed JSON or missing required fields", body = ErrorResponse),
        (status = 500, description = "Generation failed", body = ErrorResponse)
    )
)]
pub async fn generate_invoice(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    // Parsed in two stages so broken JSON and a wrong shape produce
    // distinct messages.
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return HttpResponse::BadRequest()
                .json(ErrorResponse::new("Invalid JSON in request body"))
        }
    };
    let request: InvoiceRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return HttpResponse::BadRequest()
                .json(ErrorResponse::new(format!("Invalid request payload: {e}")))
        }
    };
    if let Err(message) = request.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse::new(message));
    }

    match state.generator().generate(&request).await {
        Ok(generated) => {
            let disposition = ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(generated.filename.clone())],
            };
            HttpResponse::Ok()
                .content_type(DOCX_MIME)
                .insert_header(disposition)
                .insert_header((TEMPLATE_SOURCE_HEADER, generated.template_source.as_str()))
                .body(generated.docx)
        }
        Err(e) => {
            log::error!("Invoice generation failed: {e}");
            HttpResponse::InternalServerError()
                .json(ErrorResponse::new(format!("Failed to generate invoice: {e}")))
        }
    }
}

/// Plain OPTIONS probes get an empty 200; real CORS preflights are
/// answered by the middleware before they reach the route.
async fn preflight() -> impl Responder {
    HttpResponse::Ok().finish()
}

async fn method_not_allowed() -> impl Responder {
    HttpResponse::MethodNotAllowed().json(ErrorResponse::new("Method not allowed"))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/invoice")
            .route(web::post().to(generate_invoice))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    // Route kept from the first deployment; older clients still post here.
    .service(
        web::resource("/generate-invoice")
            .route(web::post().to(generate_invoice))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    );
}
