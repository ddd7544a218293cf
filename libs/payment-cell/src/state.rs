// libs/payment-cell/src/state.rs
use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::PaymentError;
use crate::services::gateway::{PaymentGateway, SslCommerzClient};
use crate::services::persistence::AppointmentStore;

/// Everything the payment routes need, built once at startup.
#[derive(Clone)]
pub struct PaymentState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub store: Arc<dyn AppointmentStore>,
}

impl PaymentState {
    pub fn new(
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self { config, gateway, store }
    }

    /// Wires the SSLCommerz and Supabase clients from configuration.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, PaymentError> {
        let gateway = SslCommerzClient::new(&config)?;
        let store = SupabaseClient::new(&config)?;

        Ok(Self::new(config, Arc::new(gateway), Arc::new(store)))
    }
}
