#[actix_web::main]
async fn main() -> std::io::Result<()> {
    marketix_invoice_server::run().await
}
