use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use shared_config::AppConfig;

pub const TEST_STORE_ID: &str = "testbox";
pub const TEST_STORE_PASSWD: &str = "qwerty";
pub const TEST_SERVICE_KEY: &str = "test-service-key";
pub const TEST_FRONTEND_URL: &str = "https://clinic.test";
pub const TEST_API_URL: &str = "https://api.clinic.test";

pub struct TestConfig {
    pub gateway_url: String,
    pub supabase_url: String,
    pub signing_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8081".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            signing_secret: "test-callback-signing-secret".to_string(),
        }
    }
}

impl TestConfig {
    /// Points both collaborators at the given mock servers.
    pub fn with_mocks(gateway_url: &str, supabase_url: &str) -> Self {
        Self {
            gateway_url: gateway_url.to_string(),
            supabase_url: supabase_url.to_string(),
            ..Self::default()
        }
    }

    pub fn unsigned(mut self) -> Self {
        self.signing_secret.clear();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_id: TEST_STORE_ID.to_string(),
            store_passwd: TEST_STORE_PASSWD.to_string(),
            is_live: false,
            gateway_base_url: self.gateway_url.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: TEST_SERVICE_KEY.to_string(),
            api_base_url: TEST_API_URL.to_string(),
            frontend_url: TEST_FRONTEND_URL.to_string(),
            callback_signing_secret: self.signing_secret.clone(),
            placeholder_email: "noreply@clinic.test".to_string(),
            gateway_timeout: Duration::from_secs(5),
            database_timeout: Duration::from_secs(5),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestBooking;

impl TestBooking {
    /// A complete booking body as the frontend submits it to `/api/pay`.
    pub fn json() -> Value {
        json!({
            "patient_id": "5b1f3c2e-patient",
            "department": "General Medicine",
            "doctor_id": "d-042",
            "appointment_date": "2025-03-14",
            "appointment_time": "10:30 AM",
            "patient_name": "Rahim Uddin",
            "patient_phone": "+8801711000000",
            "patient_email": "rahim@example.com",
            "patient_age": 34,
            "health_issues": "Headache / fever since 3 days, 38.5°C",
            "appointment_status": "pending",
            "fee": 800
        })
    }

    /// No email, a fee sent as a string and free text with reserved characters.
    pub fn without_email() -> Value {
        json!({
            "patient_id": "p1",
            "department": "cardiology",
            "doctor_id": "doc-7",
            "appointment_date": "2025-04-01",
            "appointment_time": "09:00",
            "patient_name": "Nusrat Jahan",
            "patient_phone": "01800000000",
            "patient_email": null,
            "patient_age": "52",
            "health_issues": "chest pain & shortness of breath",
            "appointment_status": "pending",
            "fee": "500.50"
        })
    }
}

pub struct MockGatewayResponses;

impl MockGatewayResponses {
    pub fn init_success(gateway_page_url: &str) -> Value {
        json!({
            "status": "SUCCESS",
            "failedreason": "",
            "sessionkey": "F650E87A6E3B2F1C0DB8D1A7C9E41D2B",
            "GatewayPageURL": gateway_page_url,
            "storeBanner": "https://sandbox.sslcommerz.com/stores/logos/demoLogo.png"
        })
    }

    pub fn init_failed(reason: &str) -> Value {
        json!({
            "status": "FAILED",
            "failedreason": reason,
            "sessionkey": "",
            "GatewayPageURL": ""
        })
    }

    pub fn validation_response(status: &str, tran_id: &str) -> Value {
        json!({
            "status": status,
            "tran_date": "2025-03-14 10:02:11",
            "tran_id": tran_id,
            "val_id": "250314100215Xk9Lq2Tz",
            "amount": "800.00",
            "store_amount": "780.00",
            "currency": "BDT",
            "bank_tran_id": "250314100215Z1b2c3",
            "card_type": "BKASH-BKash",
            "card_issuer": "BKash Mobile Banking",
            "risk_level": "0"
        })
    }

    /// Form fields the gateway posts to the success/fail/cancel URLs.
    pub fn callback_form(tran_id: &str, status: &str) -> String {
        format!(
            "tran_id={}&val_id=250314100215Xk9Lq2Tz&amount=800.00&card_type=BKASH-BKash\
             &card_issuer=BKash+Mobile+Banking&status={}&currency=BDT",
            tran_id, status
        )
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn error_response(code: &str, message: &str) -> Value {
        json!({
            "code": code,
            "details": null,
            "hint": null,
            "message": message
        })
    }
}
