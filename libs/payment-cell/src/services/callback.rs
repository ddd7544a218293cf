// libs/payment-cell/src/services/callback.rs
//! Carries a booking through the gateway redirect inside the success URL.
//!
//! Each booking field becomes one percent-encoded path segment, in the order of
//! the success route. An absent email travels as [`EMAIL_SENTINEL`]; free text
//! gets a [`FREE_TEXT_PREFIX`] so an empty value still makes a non-empty
//! segment. When a signing secret is configured the URL also carries an HMAC
//! over the transaction id and the encoded path.

use shared_config::AppConfig;
use shared_utils::signing;

use crate::models::{BookingRequest, CallbackBooking, PaymentError, SuccessPathParams};

pub const EMAIL_SENTINEL: &str = "null";
pub const FREE_TEXT_PREFIX: char = '~';
pub const SUCCESS_ROUTE: &str = "/payment-success";
pub const SEGMENT_COUNT: usize = 12;

/// Segment values in route order, before percent-encoding.
pub fn booking_segments(booking: &BookingRequest) -> [String; SEGMENT_COUNT] {
    [
        booking.patient_id.clone(),
        booking.department.clone(),
        booking.doctor_id.clone(),
        booking.appointment_date.clone(),
        booking.appointment_time.clone(),
        booking.patient_name.clone(),
        booking.patient_phone.clone(),
        booking
            .patient_email
            .clone()
            .unwrap_or_else(|| EMAIL_SENTINEL.to_string()),
        booking.patient_age.to_string(),
        format!("{}{}", FREE_TEXT_PREFIX, booking.health_issues),
        booking.appointment_status.clone(),
        booking.fee.to_string(),
    ]
}

pub fn encode_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Message covered by the callback signature.
pub fn canonical_message(tran_id: &str, segments: &[String]) -> String {
    format!("{}\n{}", tran_id, encode_path(segments))
}

/// Absolute success URL registered with the gateway for this transaction.
pub fn success_url(
    config: &AppConfig,
    tran_id: &str,
    booking: &BookingRequest,
) -> Result<String, PaymentError> {
    let segments = booking_segments(booking);
    let mut url = format!(
        "{}/{}?tran_id={}",
        config.api_path(SUCCESS_ROUTE),
        encode_path(&segments),
        urlencoding::encode(tran_id)
    );

    if config.is_signing_enabled() {
        let sig = signing::sign(
            &config.callback_signing_secret,
            &canonical_message(tran_id, &segments),
        )?;
        url.push_str("&sig=");
        url.push_str(&sig);
    }

    Ok(url)
}

impl SuccessPathParams {
    pub fn segments(&self) -> [String; SEGMENT_COUNT] {
        [
            self.patient_id.clone(),
            self.department.clone(),
            self.doctor_id.clone(),
            self.appointment_date.clone(),
            self.appointment_time.clone(),
            self.patient_name.clone(),
            self.patient_phone.clone(),
            self.patient_email.clone(),
            self.patient_age.clone(),
            self.health_issues.clone(),
            self.appointment_status.clone(),
            self.fee.clone(),
        ]
    }

    /// Reverses the sentinel and free-text prefix. Percent-decoding has
    /// already been done by the path extractor.
    pub fn decode(self) -> Result<CallbackBooking, PaymentError> {
        let health_issues = self
            .health_issues
            .strip_prefix(FREE_TEXT_PREFIX)
            .map(str::to_string)
            .ok_or_else(|| PaymentError::InvalidSegment {
                field: "health_issues",
                value: self.health_issues.clone(),
            })?;

        let patient_email = if self.patient_email.is_empty() || self.patient_email == EMAIL_SENTINEL {
            None
        } else {
            Some(self.patient_email)
        };

        Ok(CallbackBooking {
            patient_id: self.patient_id,
            department: self.department,
            doctor_id: self.doctor_id,
            appointment_date: self.appointment_date,
            appointment_time: self.appointment_time,
            patient_name: self.patient_name,
            patient_phone: self.patient_phone,
            patient_email,
            patient_age: self.patient_age,
            health_issues,
            appointment_status: self.appointment_status,
            fee: self.fee,
        })
    }
}

/// Checks the `sig` query parameter against the decoded path. A no-op when
/// signing is disabled.
pub fn verify_signature(
    config: &AppConfig,
    tran_id: Option<&str>,
    params: &SuccessPathParams,
    sig: Option<&str>,
) -> Result<(), PaymentError> {
    if !config.is_signing_enabled() {
        return Ok(());
    }

    let tran_id = tran_id.ok_or(PaymentError::Signature(
        signing::SignatureError::MissingSignature,
    ))?;

    signing::verify(
        &config.callback_signing_secret,
        &canonical_message(tran_id, &params.segments()),
        sig,
    )?;

    Ok(())
}
