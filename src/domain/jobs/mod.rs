pub mod dto;
pub mod error;
pub mod service;

pub use dto::{CronQuery, CronResponse, JobKind, JobReport};
pub use error::JobsServiceError;
pub use service::{JobsService, JobsServiceApi};
