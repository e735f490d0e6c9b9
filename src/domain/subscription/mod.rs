pub mod dto;
pub mod error;
pub mod model;
pub mod service;
pub mod state;

pub use dto::{SubscriptionRequest, SubscriptionResponse, SubscriptionView, VerifySubscriptionQuery};
pub use error::SubscriptionServiceError;
pub use model::{Subscription, SubscriptionStatus, SubscriptionTier};
pub use service::{SubscriptionService, SubscriptionServiceApi};
