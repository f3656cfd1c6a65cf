#[actix_web::main]
async fn main() -> std::io::Result<()> {
    property_stock_report::run().await
}
