pub mod config;
pub mod error;
pub mod logging;
pub mod quota;

pub use config::Config;
pub use error::QuotaError;
pub use quota::{
    Operation, QuotaClient, QuotaMap, ReservationId, SubscriptionQuotaMap, compose_reservation_id,
};
