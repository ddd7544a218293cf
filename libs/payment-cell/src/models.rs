// libs/payment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use shared_database::SupabaseError;
use shared_utils::signing::SignatureError;

use crate::services::gateway::GatewayError;

pub const APPOINTMENTS_TABLE: &str = "appointments";
pub const CURRENCY: &str = "BDT";
pub const MAX_HEALTH_ISSUES_LEN: usize = 1000;
pub const MAX_PATIENT_AGE: i32 = 150;
pub const MAX_FEE_SCALE: u32 = 2;

// ==============================================================================
// BOOKING INTAKE
// ==============================================================================

/// Booking form as submitted to `POST /api/pay`.
///
/// Unknown fields are ignored; in particular a client-supplied `payment_status`
/// never reaches the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_id: String,
    pub department: String,
    pub doctor_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub patient_name: String,
    pub patient_phone: String,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(deserialize_with = "deserialize_age")]
    pub patient_age: i32,
    #[serde(default)]
    pub health_issues: String,
    #[serde(default = "default_appointment_status")]
    pub appointment_status: String,
    pub fee: Decimal,
}

fn default_appointment_status() -> String {
    "pending".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

fn deserialize_age<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(n) => n,
        IntOrString::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("patient_age is not an integer: {:?}", s)))?,
    };

    i32::try_from(raw).map_err(|_| serde::de::Error::custom("patient_age is out of range"))
}

impl BookingRequest {
    /// Trims the identifiers, folds an empty email into absence and checks
    /// every field, returning the normalized booking.
    pub fn validated(mut self) -> Result<Self, PaymentError> {
        for (field, value) in [
            ("patient_id", &mut self.patient_id),
            ("department", &mut self.department),
            ("doctor_id", &mut self.doctor_id),
            ("appointment_date", &mut self.appointment_date),
            ("appointment_time", &mut self.appointment_time),
            ("patient_name", &mut self.patient_name),
            ("patient_phone", &mut self.patient_phone),
            ("appointment_status", &mut self.appointment_status),
        ] {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(PaymentError::Validation(format!("{} is required", field)));
            }
        }

        NaiveDate::parse_from_str(&self.appointment_date, "%Y-%m-%d").map_err(|_| {
            PaymentError::Validation(format!(
                "appointment_date must be YYYY-MM-DD, got {:?}",
                self.appointment_date
            ))
        })?;

        self.patient_email = self
            .patient_email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());

        if let Some(email) = &self.patient_email {
            if !email.contains('@') {
                return Err(PaymentError::Validation(format!(
                    "patient_email is not an email address: {:?}",
                    email
                )));
            }
        }

        if !(0..=MAX_PATIENT_AGE).contains(&self.patient_age) {
            return Err(PaymentError::Validation(format!(
                "patient_age must be between 0 and {}",
                MAX_PATIENT_AGE
            )));
        }

        if self.fee <= Decimal::ZERO {
            return Err(PaymentError::Validation("fee must be greater than zero".to_string()));
        }

        // The gateway charges to the paisa; anything finer would be stored but never charged.
        if self.fee.normalize().scale() > MAX_FEE_SCALE {
            return Err(PaymentError::Validation(format!(
                "fee must have at most {} decimal places, got {}",
                MAX_FEE_SCALE, self.fee
            )));
        }
        self.fee = self.fee.round_dp(MAX_FEE_SCALE);

        if self.health_issues.chars().count() > MAX_HEALTH_ISSUES_LEN {
            return Err(PaymentError::Validation(format!(
                "health_issues must be at most {} characters",
                MAX_HEALTH_ISSUES_LEN
            )));
        }

        Ok(self)
    }
}

// ==============================================================================
// GATEWAY SESSION
// ==============================================================================

/// Transaction opened with the gateway. Store credentials are added by the
/// gateway client, not carried here.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSession {
    pub tran_id: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub ipn_url: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub department: String,
    pub doctor_id: String,
}

impl PaymentSession {
    /// Session fields in the gateway's form vocabulary.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tran_id", self.tran_id.clone()),
            ("total_amount", format!("{:.2}", self.total_amount)),
            ("currency", self.currency.clone()),
            ("success_url", self.success_url.clone()),
            ("fail_url", self.fail_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("ipn_url", self.ipn_url.clone()),
            ("shipping_method", "No".to_string()),
            ("product_name", "Appointment".to_string()),
            ("product_category", "Clinic".to_string()),
            ("product_profile", "non-physical-goods".to_string()),
            ("cus_name", self.customer_name.clone()),
            ("cus_email", self.customer_email.clone()),
            ("cus_add1", self.department.clone()),
            ("cus_city", "N/A".to_string()),
            ("cus_postcode", "N/A".to_string()),
            ("cus_country", "Bangladesh".to_string()),
            ("cus_phone", self.customer_phone.clone()),
            ("ship_name", self.doctor_id.clone()),
            ("ship_add1", self.doctor_id.clone()),
            ("ship_city", "N/A".to_string()),
            ("ship_postcode", "N/A".to_string()),
            ("ship_country", "Bangladesh".to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSession {
    pub gateway_page_url: String,
    pub session_key: Option<String>,
}

// ==============================================================================
// SUCCESS CALLBACK
// ==============================================================================

/// Path parameters of the success route, already percent-decoded by the router.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuccessPathParams {
    pub patient_id: String,
    pub department: String,
    pub doctor_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: String,
    pub patient_age: String,
    pub health_issues: String,
    pub appointment_status: String,
    pub fee: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuccessQuery {
    pub tran_id: Option<String>,
    pub sig: Option<String>,
}

/// Booking fields recovered from the success URL. Numbers are still text:
/// parsing them is part of building the record.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackBooking {
    pub patient_id: String,
    pub department: String,
    pub doctor_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: Option<String>,
    pub patient_age: String,
    pub health_issues: String,
    pub appointment_status: String,
    pub fee: String,
}

// ==============================================================================
// PERSISTED APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Row inserted into `appointments` once the gateway has confirmed payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub patient_id: String,
    pub department: String,
    pub doctor_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: Option<String>,
    pub patient_age: i32,
    pub health_issues: String,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub appointment_status: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
}

impl AppointmentRecord {
    pub fn from_callback(
        booking: CallbackBooking,
        payment_method: Option<String>,
    ) -> Result<Self, PaymentError> {
        let patient_age = booking.patient_age.trim().parse::<i32>().map_err(|_| {
            PaymentError::InvalidField {
                field: "patient_age",
                value: booking.patient_age.clone(),
            }
        })?;

        let fee = Decimal::from_str(booking.fee.trim()).map_err(|_| PaymentError::InvalidField {
            field: "fee",
            value: booking.fee.clone(),
        })?;

        Ok(Self {
            patient_id: booking.patient_id,
            department: booking.department,
            doctor_id: booking.doctor_id,
            appointment_date: booking.appointment_date,
            appointment_time: booking.appointment_time,
            patient_name: booking.patient_name,
            patient_phone: booking.patient_phone,
            patient_email: booking.patient_email,
            patient_age,
            health_issues: booking.health_issues,
            payment_method,
            payment_status: PaymentStatus::Completed,
            appointment_status: booking.appointment_status,
            fee,
        })
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Reason code appended to the frontend failure page as `?error=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Validation,
    Database,
    Tampered,
    Internal,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Validation => "validation",
            FailureReason::Database => "database",
            FailureReason::Tampered => "tampered",
            FailureReason::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Payment could not be verified with the gateway")]
    Unverified,

    #[error("Callback URL carries no transaction id")]
    MissingTransaction,

    #[error("Callback transaction {expected} does not match payload transaction {actual}")]
    TransactionMismatch { expected: String, actual: String },

    #[error("Callback signature rejected: {0}")]
    Signature(#[from] SignatureError),

    #[error("Malformed callback segment {field}: {value:?}")]
    InvalidSegment { field: &'static str, value: String },

    #[error("Invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl PaymentError {
    pub fn reason(&self) -> FailureReason {
        match self {
            PaymentError::Gateway(_)
            | PaymentError::Unverified
            | PaymentError::TransactionMismatch { .. } => FailureReason::Validation,
            PaymentError::Signature(_)
            | PaymentError::InvalidSegment { .. }
            | PaymentError::MissingTransaction => {
                FailureReason::Tampered
            }
            PaymentError::InvalidField { .. } | PaymentError::Database(_) => FailureReason::Database,
            PaymentError::Validation(_) => FailureReason::Internal,
        }
    }

    /// Machine-readable detail for the failure page, when one exists.
    pub fn code(&self) -> Option<String> {
        match self {
            PaymentError::Database(err) => err.code().map(str::to_string),
            PaymentError::InvalidField { field, .. } => Some(format!("invalid_{}", field)),
            _ => None,
        }
    }
}
