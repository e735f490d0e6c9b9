pub mod dto;
pub mod error;
pub mod service;

pub use dto::{WebhookAck, WebhookEvent};
pub use error::WebhookServiceError;
pub use service::{WebhookService, WebhookServiceApi};
