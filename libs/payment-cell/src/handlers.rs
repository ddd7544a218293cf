// libs/payment-cell/src/handlers.rs
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::{GatewayPayload, PayloadRejection};

use crate::models::{BookingRequest, FailureReason, PaymentError, SuccessPathParams, SuccessQuery};
use crate::services::confirmation::{log_rejection, PaymentConfirmationService};
use crate::services::session::PaymentSessionService;
use crate::state::PaymentState;

/// Frontend failure page with a reason code and, when known, the collaborator's error code.
pub fn failure_redirect(config: &AppConfig, reason: FailureReason, code: Option<String>) -> Redirect {
    let mut url = format!("{}?error={}", config.frontend_path("/payment-fail"), reason);
    if let Some(code) = code {
        url.push_str("&code=");
        url.push_str(&urlencoding::encode(&code));
    }
    Redirect::to(&url)
}

fn payload_or_empty(payload: Result<GatewayPayload, PayloadRejection>, route: &str) -> GatewayPayload {
    payload.unwrap_or_else(|e| {
        warn!("Unreadable payload on {}: {}", route, e);
        GatewayPayload::default()
    })
}

// ==============================================================================
// PAYMENT INITIATION
// ==============================================================================

#[axum::debug_handler]
pub async fn initiate_payment(
    State(state): State<PaymentState>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(booking) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let booking = booking.validated().map_err(|e| match e {
        PaymentError::Validation(msg) => AppError::ValidationError(msg),
        other => AppError::Internal(other.to_string()),
    })?;

    let service = PaymentSessionService::new(&state);

    let (tran_id, checkout) = service.initiate(&booking).await.map_err(|e| match e {
        PaymentError::Gateway(err) => AppError::Upstream {
            message: "Failed to initiate payment".to_string(),
            details: err.public_details(),
        },
        other => AppError::Internal(other.to_string()),
    })?;

    info!("Checkout ready for transaction {}", tran_id);

    Ok(Json(json!({ "url": checkout.gateway_page_url })))
}

// ==============================================================================
// GATEWAY CALLBACKS
// ==============================================================================

#[axum::debug_handler]
pub async fn payment_success(
    State(state): State<PaymentState>,
    params: Result<Path<SuccessPathParams>, PathRejection>,
    query: Result<Query<SuccessQuery>, QueryRejection>,
    payload: Result<GatewayPayload, PayloadRejection>,
) -> Redirect {
    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            error!("Success Handler Error: unreadable payload: {}", e);
            return failure_redirect(&state.config, FailureReason::Internal, None);
        }
    };

    info!("Payment Success callback: {:?}", payload);

    let params = match params {
        Ok(Path(params)) => params,
        Err(e) => {
            error!("Success Handler Error: malformed path: {}", e);
            return failure_redirect(&state.config, FailureReason::Internal, None);
        }
    };

    let query = query.map(|Query(q)| q).unwrap_or_else(|e| {
        warn!("Malformed success query string: {}", e);
        SuccessQuery::default()
    });

    let service = PaymentConfirmationService::new(&state);

    match service.confirm(params, query, &payload).await {
        Ok(_) => Redirect::to(&state.config.frontend_path("/payment-success")),
        Err(e) => {
            log_rejection(&e, &payload);
            failure_redirect(&state.config, e.reason(), e.code())
        }
    }
}

#[axum::debug_handler]
pub async fn payment_fail(
    State(state): State<PaymentState>,
    payload: Result<GatewayPayload, PayloadRejection>,
) -> Redirect {
    let payload = payload_or_empty(payload, "/payment-fail");
    warn!("Payment Failed: {:?}", payload);

    Redirect::to(&state.config.frontend_path("/payment-fail"))
}

#[axum::debug_handler]
pub async fn payment_cancel(
    State(state): State<PaymentState>,
    payload: Result<GatewayPayload, PayloadRejection>,
) -> Redirect {
    let payload = payload_or_empty(payload, "/payment-cancel");
    warn!("Payment Cancelled: {:?}", payload);

    Redirect::to(&state.config.frontend_path("/payment-cancel"))
}

#[axum::debug_handler]
pub async fn payment_ipn(
    payload: Result<GatewayPayload, PayloadRejection>,
) -> impl IntoResponse {
    let payload = payload_or_empty(payload, "/ipn");
    info!("IPN Received: {:?}", payload);

    (StatusCode::OK, "IPN received successfully.")
}
