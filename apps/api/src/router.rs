use std::any::Any;

use axum::{
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use payment_cell::{payment_routes, FailureReason, PaymentState};
use shared_config::AppConfig;

pub fn create_router(state: PaymentState) -> Router {
    let catch_panic = catch_panic_layer(&state.config);

    Router::new()
        .route("/", get(|| async { "Clinic payment server is running" }))
        .merge(payment_routes(state))
        .layer(catch_panic)
}

fn catch_panic_layer(
    config: &AppConfig,
) -> CatchPanicLayer<impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static> {
    let failure_url = format!(
        "{}?error={}",
        config.frontend_path("/payment-fail"),
        FailureReason::Internal
    );

    CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
        panic_redirect(&failure_url, panic)
    })
}

/// Never show a panic to the browser; send it to the generic failure page.
fn panic_redirect(failure_url: &str, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!("Handler panicked: {}", detail);
    Redirect::to(failure_url).into_response()
}
