// libs/payment-cell/src/router.rs
use axum::{routing::post, Router};

use crate::handlers;
use crate::state::PaymentState;

/// Success route; segment order must match `services::callback::booking_segments`.
pub const SUCCESS_PATH: &str = "/payment-success/{patient_id}/{department}/{doctor_id}/{appointment_date}/{appointment_time}/{patient_name}/{patient_phone}/{patient_email}/{patient_age}/{health_issues}/{appointment_status}/{fee}";

/// Creates the payment routes. The callback routes are public: the gateway
/// and the returning browser call them without credentials.
pub fn payment_routes(state: PaymentState) -> Router {
    Router::new()
        .route("/api/pay", post(handlers::initiate_payment))
        .route(SUCCESS_PATH, post(handlers::payment_success))
        .route("/payment-fail", post(handlers::payment_fail))
        .route("/payment-cancel", post(handlers::payment_cancel))
        .route("/ipn", post(handlers::payment_ipn))
        .with_state(state)
}
