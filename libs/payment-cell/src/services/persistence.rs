// libs/payment-cell/src/services/persistence.rs
use async_trait::async_trait;
use tracing::{debug, info};

use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{AppointmentRecord, APPOINTMENTS_TABLE};

/// Durable home of confirmed appointments. Insert only.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert_appointment(&self, record: &AppointmentRecord) -> Result<(), SupabaseError>;
}

#[async_trait]
impl AppointmentStore for SupabaseClient {
    async fn insert_appointment(&self, record: &AppointmentRecord) -> Result<(), SupabaseError> {
        debug!(
            "Inserting appointment for patient {} with doctor {}",
            record.patient_id, record.doctor_id
        );

        self.insert(APPOINTMENTS_TABLE, std::slice::from_ref(record)).await?;

        info!(
            "Appointment stored for patient {} on {} {}",
            record.patient_id, record.appointment_date, record.appointment_time
        );
        Ok(())
    }
}
