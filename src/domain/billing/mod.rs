pub mod dto;
pub mod error;
pub mod model;
pub mod quota;
pub mod service;

pub use dto::{
    BalanceResponse, DepositRequest, DepositResponse, OperationCheckResponse, OperationRequest,
    OperationResponse, VerifyDepositRequest, VerifyDepositResponse,
};
pub use error::BillingServiceError;
pub use model::{OperationCount, Transaction, TransactionStatus};
pub use service::{BillingService, BillingServiceApi};
