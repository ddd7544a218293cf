pub mod callback;
pub mod confirmation;
pub mod gateway;
pub mod persistence;
pub mod session;

pub use confirmation::PaymentConfirmationService;
pub use gateway::{GatewayError, PaymentGateway, SslCommerzClient};
pub use persistence::AppointmentStore;
pub use session::PaymentSessionService;
