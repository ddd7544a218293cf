// libs/payment-cell/src/services/confirmation.rs
use std::sync::Arc;

use tracing::{error, info, warn};

use shared_config::AppConfig;
use shared_utils::extractor::GatewayPayload;

use crate::models::{AppointmentRecord, PaymentError, SuccessPathParams, SuccessQuery};
use crate::services::callback;
use crate::services::gateway::PaymentGateway;
use crate::services::persistence::AppointmentStore;
use crate::state::PaymentState;

/// Gateway fields that may name the payment method, in order of preference.
const PAYMENT_METHOD_FIELDS: [&str; 3] = ["payment_method", "card_type", "card_issuer"];

pub fn payment_method(payload: &GatewayPayload) -> Option<String> {
    PAYMENT_METHOD_FIELDS.iter().find_map(|field| payload.get(field))
}

/// Turns a gateway success callback into a stored appointment.
pub struct PaymentConfirmationService {
    config: Arc<AppConfig>,
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn AppointmentStore>,
}

impl PaymentConfirmationService {
    pub fn new(state: &PaymentState) -> Self {
        Self {
            config: state.config.clone(),
            gateway: state.gateway.clone(),
            store: state.store.clone(),
        }
    }

    /// Signature, then transaction binding, then gateway validation against the
    /// URL's transaction, then a single insert. Nothing is written unless every
    /// check passes.
    pub async fn confirm(
        &self,
        params: SuccessPathParams,
        query: SuccessQuery,
        payload: &GatewayPayload,
    ) -> Result<AppointmentRecord, PaymentError> {
        callback::verify_signature(
            &self.config,
            query.tran_id.as_deref(),
            &params,
            query.sig.as_deref(),
        )?;

        // Every issued success URL names its transaction; one without it has been altered.
        let expected = query.tran_id.ok_or(PaymentError::MissingTransaction)?;

        if let Some(actual) = payload.get("tran_id") {
            if actual != expected {
                return Err(PaymentError::TransactionMismatch { expected, actual });
            }
        }

        let booking = params.decode()?;

        let trusted = self.gateway.validate(payload, &expected).await.map_err(|e| {
            error!("Gateway validation call failed: {}", e);
            PaymentError::Gateway(e)
        })?;

        if !trusted {
            return Err(PaymentError::Unverified);
        }

        let record = AppointmentRecord::from_callback(booking, payment_method(payload))?;

        if let Err(e) = self.store.insert_appointment(&record).await {
            // Money has been captured at this point; the record below is what
            // has to be reconciled by hand.
            error!(
                "Payment captured but appointment not stored (tran_id={}, val_id={:?}): {}; record: {:?}",
                expected,
                payload.get("val_id"),
                e,
                record
            );
            return Err(PaymentError::Database(e));
        }

        info!(
            "Appointment confirmed for patient {} (tran_id={})",
            record.patient_id, expected
        );
        Ok(record)
    }
}

/// Logs a rejected success callback at a level matching its severity.
pub fn log_rejection(err: &PaymentError, payload: &GatewayPayload) {
    match err {
        PaymentError::Database(_) | PaymentError::InvalidField { .. } => {
            error!("Success callback could not be persisted: {}", err)
        }
        PaymentError::Signature(_) | PaymentError::InvalidSegment { .. } => {
            warn!("Tampered success callback rejected: {}; payload: {:?}", err, payload)
        }
        _ => error!("Invalid webhook: {}; payload: {:?}", err, payload),
    }
}
