// libs/payment-cell/src/lib.rs
//! # Payment Cell
//!
//! Pay-before-booking flow for clinic appointments on top of the SSLCommerz
//! hosted checkout.
//!
//! ## Flow
//!
//! ```text
//! POST /api/pay ──> SSLCommerz checkout ──> POST /payment-success/...
//!                                            │ signature + tran_id check
//!                                            │ gateway validation
//!                                            └─> insert into `appointments`
//!                                                 └─> redirect to frontend
//! ```
//!
//! No session storage is kept between the two halves: the booking rides in
//! the success URL (see [`services::callback`]).
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                   Payment Cell                      |
//! +-----------------------------------------------------+
//! |  handlers.rs     |  HTTP endpoint handlers          |
//! |  router.rs       |  Route definitions               |
//! |  models.rs       |  Bookings, sessions, records     |
//! |  state.rs        |  Shared collaborators            |
//! |  services/       |                                  |
//! |    callback.rs   |  Success URL encoding & signing  |
//! |    gateway.rs    |  SSLCommerz client               |
//! |    session.rs    |  Payment initiation              |
//! |    confirmation.rs| Validation and persistence      |
//! |    persistence.rs|  Appointment store               |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /api/pay` - Validate a booking and return the checkout URL
//! - `POST /payment-success/{...12 booking segments}` - Gateway success callback
//! - `POST /payment-fail` - Gateway failure callback
//! - `POST /payment-cancel` - Gateway cancellation callback
//! - `POST /ipn` - Instant payment notification
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use payment_cell::{payment_routes, PaymentState};
//! use shared_config::AppConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(AppConfig::from_env());
//! let routes = payment_routes(PaymentState::from_config(config)?);
//! # Ok(())
//! # }
//! ```

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::{
    AppointmentRecord, BookingRequest, CheckoutSession, FailureReason, PaymentError,
    PaymentSession, PaymentStatus,
};

pub use services::{
    AppointmentStore, GatewayError, PaymentConfirmationService, PaymentGateway,
    PaymentSessionService, SslCommerzClient,
};

pub use router::payment_routes;
pub use state::PaymentState;
