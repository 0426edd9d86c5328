use std::sync::Arc;

use fiacre::engine::Engine;
use fiacre::external::google_maps::GoogleMaps;
use fiacre::external::webhook::BookingWebhook;
use fiacre::fare::FareSchedule;
use fiacre::server::serve;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let engine = Engine::new(
        FareSchedule::default(),
        Arc::new(GoogleMaps::new()),
        Arc::new(BookingWebhook::new()),
    );

    serve(engine).await;
}
