mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::auth::User;
use crate::server::handlers::{bookings, fares, places};

pub async fn serve<T: API + Sync + Send + 'static>(api: T) {
    tracing_subscriber::fmt::init();

    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/bookings", post(bookings::create))
        .route(
            "/bookings/:token",
            get(bookings::find).patch(bookings::update),
        )
        .route("/bookings/:token/next", patch(bookings::next))
        .route("/bookings/:token/back", patch(bookings::back))
        .route("/bookings/:token/stage/:target", patch(bookings::go_to))
        .route("/fares", post(fares::calculate))
        .route("/fares/range", get(fares::range))
        .route("/places/suggestions", get(places::find_suggestions))
        .route("/places/:id", get(places::find))
        .layer(Extension(api))
        .layer(Extension(User::new_system_user()));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
