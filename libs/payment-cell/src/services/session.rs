// libs/payment-cell/src/services/session.rs
use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{BookingRequest, CheckoutSession, PaymentError, PaymentSession, CURRENCY};
use crate::services::callback;
use crate::services::gateway::PaymentGateway;
use crate::state::PaymentState;

pub struct PaymentSessionService {
    config: Arc<AppConfig>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentSessionService {
    pub fn new(state: &PaymentState) -> Self {
        Self {
            config: state.config.clone(),
            gateway: state.gateway.clone(),
        }
    }

    /// Gateway session for `booking`; the success URL carries the booking itself.
    pub fn build_session(
        &self,
        tran_id: &str,
        booking: &BookingRequest,
    ) -> Result<PaymentSession, PaymentError> {
        Ok(PaymentSession {
            tran_id: tran_id.to_string(),
            total_amount: booking.fee,
            currency: CURRENCY.to_string(),
            success_url: callback::success_url(&self.config, tran_id, booking)?,
            fail_url: self.config.api_path("/payment-fail"),
            cancel_url: self.config.api_path("/payment-cancel"),
            ipn_url: self.config.api_path("/ipn"),
            customer_name: booking.patient_name.clone(),
            customer_email: booking
                .patient_email
                .clone()
                .unwrap_or_else(|| self.config.placeholder_email.clone()),
            customer_phone: booking.patient_phone.clone(),
            department: booking.department.clone(),
            doctor_id: booking.doctor_id.clone(),
        })
    }

    /// Opens a fresh transaction for a validated booking.
    pub async fn initiate(
        &self,
        booking: &BookingRequest,
    ) -> Result<(String, CheckoutSession), PaymentError> {
        let tran_id = Uuid::new_v4().to_string();
        let session = self.build_session(&tran_id, booking)?;

        info!(
            "Opening payment {} for patient {} ({} {})",
            tran_id, booking.patient_id, session.total_amount, session.currency
        );

        let checkout = self.gateway.init_session(&session).await.map_err(|e| {
            error!("Payment initiation failed for transaction {}: {}", tran_id, e);
            PaymentError::Gateway(e)
        })?;

        Ok((tran_id, checkout))
    }
}
