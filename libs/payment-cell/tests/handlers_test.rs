use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::{payment_routes, PaymentState};
use shared_utils::test_utils::{
    MockGatewayResponses, MockSupabaseResponses, TestBooking, TestConfig, TEST_API_URL,
    TEST_FRONTEND_URL,
};

struct Harness {
    gateway: MockServer,
    supabase: MockServer,
    config: TestConfig,
}

impl Harness {
    async fn start() -> Self {
        let gateway = MockServer::start().await;
        let supabase = MockServer::start().await;
        let config = TestConfig::with_mocks(&gateway.uri(), &supabase.uri());
        Self { gateway, supabase, config }
    }

    /// Signing disabled, as when `CALLBACK_SIGNING_SECRET` is unset.
    async fn start_unsigned() -> Self {
        let gateway = MockServer::start().await;
        let supabase = MockServer::start().await;
        let config = TestConfig::with_mocks(&gateway.uri(), &supabase.uri()).unsigned();
        Self { gateway, supabase, config }
    }

    fn app(&self) -> Router {
        let state = PaymentState::from_config(self.config.to_arc()).unwrap();
        payment_routes(state)
    }

    async fn mock_init_success(&self) {
        Mock::given(method("POST"))
            .and(path("/gwprocess/v4/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                MockGatewayResponses::init_success("https://sandbox.sslcommerz.test/EasyCheckOut/abc"),
            ))
            .mount(&self.gateway)
            .await;
    }

    async fn mock_validation(&self, status: &str, tran_id: &str) {
        Mock::given(method("GET"))
            .and(path("/validator/api/validationserverAPI.php"))
            .and(query_param("val_id", "250314100215Xk9Lq2Tz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                MockGatewayResponses::validation_response(status, tran_id),
            ))
            .mount(&self.gateway)
            .await;
    }

    /// Submits a booking and returns the success URL (path and query,
    /// relative to the API) that was registered with the gateway.
    async fn book(&self, booking: Value) -> (String, String) {
        let response = self.app().oneshot(pay_request(&booking)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let received = self.gateway.received_requests().await.unwrap();
        let init = received
            .iter()
            .rev()
            .find(|r| r.url.path() == "/gwprocess/v4/api.php")
            .expect("gateway init call");

        let fields: Vec<(String, String)> = url::form_urlencoded::parse(&init.body)
            .into_owned()
            .collect();
        let field = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let success_url = field("success_url");
        let relative = success_url
            .strip_prefix(TEST_API_URL)
            .expect("success url on the API host")
            .to_string();

        (relative, field("tran_id"))
    }

    async fn inserted_rows(&self) -> Vec<Value> {
        self.supabase
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/rest/v1/appointments")
            .flat_map(|r| {
                serde_json::from_slice::<Vec<Value>>(&r.body).unwrap()
            })
            .collect()
    }
}

fn pay_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/pay")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn callback_request(uri: &str, form: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// ==============================================================================
// POST /api/pay
// ==============================================================================

#[tokio::test]
async fn test_pay_returns_checkout_url() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;

    let response = harness.app().oneshot(pay_request(&TestBooking::json())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["url"], "https://sandbox.sslcommerz.test/EasyCheckOut/abc");
}

#[tokio::test]
async fn test_pay_gateway_rejection_is_500_with_details() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/gwprocess/v4/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockGatewayResponses::init_failed("Store Credential Error Or Store is De-active"),
        ))
        .mount(&harness.gateway)
        .await;

    let response = harness.app().oneshot(pay_request(&TestBooking::json())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to initiate payment");
    assert_eq!(json["details"]["failedreason"], "Store Credential Error Or Store is De-active");
}

#[tokio::test]
async fn test_pay_gateway_outage_is_generic_500() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>maintenance</html>"))
        .mount(&harness.gateway)
        .await;

    let response = harness.app().oneshot(pay_request(&TestBooking::json())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to initiate payment");
    assert_eq!(json["details"]["reason"], "gateway unavailable");
}

#[tokio::test]
async fn test_pay_rejects_malformed_booking_before_gateway() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.gateway)
        .await;

    let mut missing_fee = TestBooking::json();
    missing_fee.as_object_mut().unwrap().remove("fee");
    let response = harness.app().oneshot(pay_request(&missing_fee)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut bad_date = TestBooking::json();
    bad_date["appointment_date"] = json!("next tuesday");
    let response = harness.app().oneshot(pay_request(&bad_date)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("appointment_date"));

    let mut sub_paisa = TestBooking::json();
    sub_paisa["fee"] = json!("500.505");
    let response = harness.app().oneshot(pay_request(&sub_paisa)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].as_str().unwrap().contains("fee"));
}

#[tokio::test]
async fn test_charged_amount_matches_fee_in_success_url() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;

    let mut booking = TestBooking::json();
    booking["fee"] = json!("650.500");
    let (success_uri, _) = harness.book(booking).await;

    let received = harness.gateway.received_requests().await.unwrap();
    let charged = url::form_urlencoded::parse(&received[0].body)
        .find(|(k, _)| k == "total_amount")
        .map(|(_, v)| v.into_owned());

    assert_eq!(charged.as_deref(), Some("650.50"));
    assert!(success_uri.contains("/650.50?tran_id="));
}

// ==============================================================================
// POST /payment-success/...
// ==============================================================================

#[tokio::test]
async fn test_full_flow_persists_completed_appointment() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;

    let (success_uri, tran_id) = harness.book(TestBooking::without_email()).await;
    assert!(success_uri.starts_with("/payment-success/p1/cardiology/"));
    assert!(success_uri.contains("/null/"));

    harness.mock_validation("VALID", &tran_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&harness.supabase)
        .await;

    let response = harness
        .app()
        .oneshot(callback_request(
            &success_uri,
            MockGatewayResponses::callback_form(&tran_id, "VALID"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("{}/payment-success", TEST_FRONTEND_URL));

    let rows = harness.inserted_rows().await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["patient_id"], "p1");
    assert_eq!(row["department"], "cardiology");
    assert_eq!(row["payment_status"], "completed");
    assert!(row["patient_email"].is_null());
    assert_eq!(row["health_issues"], "chest pain & shortness of breath");
    assert_eq!(row["patient_age"], json!(52));
    assert!(row["fee"].is_number());
    assert_eq!(row["fee"].as_f64(), Some(500.5));
    assert_eq!(row["payment_method"], "BKASH-BKash");
}

#[tokio::test]
async fn test_invalid_webhook_redirects_without_insert() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;
    let (success_uri, tran_id) = harness.book(TestBooking::json()).await;

    harness.mock_validation("INVALID_TRANSACTION", &tran_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&harness.supabase)
        .await;

    let response = harness
        .app()
        .oneshot(callback_request(
            &success_uri,
            MockGatewayResponses::callback_form(&tran_id, "VALID"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("{}/payment-fail?error=validation", TEST_FRONTEND_URL)
    );
}

#[tokio::test]
async fn test_val_id_from_another_transaction_is_not_stored() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;
    let (success_uri, _) = harness.book(TestBooking::json()).await;

    // Genuine validation, but for a cheaper transaction paid elsewhere.
    harness.mock_validation("VALID", "cheap-tran").await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&harness.supabase)
        .await;

    let response = harness
        .app()
        .oneshot(callback_request(
            &success_uri,
            "val_id=250314100215Xk9Lq2Tz".to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        format!("{}/payment-fail?error=validation", TEST_FRONTEND_URL)
    );
    assert!(harness.inserted_rows().await.is_empty());
}

#[tokio::test]
async fn test_success_url_stripped_of_tran_id_is_rejected_when_unsigned() {
    let harness = Harness::start_unsigned().await;
    harness.mock_init_success().await;
    let (success_uri, tran_id) = harness.book(TestBooking::json()).await;
    let (stripped, _) = success_uri.split_once('?').unwrap();

    harness.mock_validation("VALID", &tran_id).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&harness.supabase)
        .await;

    let response = harness
        .app()
        .oneshot(callback_request(stripped, "val_id=250314100215Xk9Lq2Tz".to_string()))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        format!("{}/payment-fail?error=tampered", TEST_FRONTEND_URL)
    );
}

#[tokio::test]
async fn test_unsigned_full_flow_persists_completed_appointment() {
    let harness = Harness::start_unsigned().await;
    harness.mock_init_success().await;

    let (success_uri, tran_id) = harness.book(TestBooking::json()).await;
    assert!(!success_uri.contains("sig="));
    assert!(success_uri.ends_with(&format!("?tran_id={}", tran_id)));

    harness.mock_validation("VALIDATED", &tran_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&harness.supabase)
        .await;

    let response = harness
        .app()
        .oneshot(callback_request(
            &success_uri,
            MockGatewayResponses::callback_form(&tran_id, "VALID"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("{}/payment-success", TEST_FRONTEND_URL));

    let rows = harness.inserted_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["payment_status"], "completed");
    assert_eq!(rows[0]["fee"].as_f64(), Some(800.0));
}

#[tokio::test]
async fn test_database_error_redirects_with_code_after_single_attempt() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;
    let (success_uri, tran_id) = harness.book(TestBooking::json()).await;

    harness.mock_validation("VALIDATED", &tran_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            MockSupabaseResponses::error_response("23502", "null value in column \"doctor_id\""),
        ))
        .expect(1)
        .mount(&harness.supabase)
        .await;

    let response = harness
        .app()
        .oneshot(callback_request(
            &success_uri,
            MockGatewayResponses::callback_form(&tran_id, "VALID"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("{}/payment-fail?error=database&code=23502", TEST_FRONTEND_URL)
    );
}

#[tokio::test]
async fn test_tampered_success_url_is_rejected_before_validation() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;
    let (success_uri, tran_id) = harness.book(TestBooking::json()).await;

    Mock::given(method("GET"))
        .and(path("/validator/api/validationserverAPI.php"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.gateway)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&harness.supabase)
        .await;

    let tampered = success_uri.replacen("/800?", "/1?", 1);
    assert_ne!(tampered, success_uri);

    let response = harness
        .app()
        .oneshot(callback_request(
            &tampered,
            MockGatewayResponses::callback_form(&tran_id, "VALID"),
        ))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        format!("{}/payment-fail?error=tampered", TEST_FRONTEND_URL)
    );
}

#[tokio::test]
async fn test_success_with_unreadable_payload_is_generic_failure() {
    let harness = Harness::start().await;
    harness.mock_init_success().await;
    let (success_uri, _) = harness.book(TestBooking::json()).await;

    let request = Request::builder()
        .method("POST")
        .uri(&success_uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{broken"))
        .unwrap();
    let response = harness.app().oneshot(request).await.unwrap();

    assert_eq!(
        location(&response),
        format!("{}/payment-fail?error=internal", TEST_FRONTEND_URL)
    );
}

// ==============================================================================
// POST /payment-fail, /payment-cancel, /ipn
// ==============================================================================

#[tokio::test]
async fn test_fail_and_cancel_redirect_to_frontend() {
    let harness = Harness::start().await;

    let response = harness
        .app()
        .oneshot(callback_request(
            "/payment-fail",
            MockGatewayResponses::callback_form("tran-1", "FAILED"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("{}/payment-fail", TEST_FRONTEND_URL));

    let response = harness
        .app()
        .oneshot(callback_request(
            "/payment-cancel",
            MockGatewayResponses::callback_form("tran-1", "CANCELLED"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("{}/payment-cancel", TEST_FRONTEND_URL));
}

#[tokio::test]
async fn test_ipn_is_acknowledged() {
    let harness = Harness::start().await;

    let response = harness
        .app()
        .oneshot(callback_request(
            "/ipn",
            MockGatewayResponses::callback_form("tran-1", "VALID"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"IPN received successfully.");
}
