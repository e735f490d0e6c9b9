use super::dto::{
    AccountState, BalanceResponse, DepositResponse, OperationCharge, OperationCheckResponse,
    OperationResponse, TransactionView, VerifyDepositResponse,
};
use super::error::BillingServiceError;
use super::model::{Transaction, TransactionStatus};
use super::quota::{self, Charge, Quota, OPERATION_COST};
use crate::domain::user::User;
use crate::infrastructure::payments::{OrderCapture, PaymentGateway};
use crate::infrastructure::repositories::{TransactionRepository, UsageRepository, UserRepository};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

const RECENT_TRANSACTIONS: i64 = 10;

pub struct BillingService {
    user_repo: Arc<dyn UserRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    usage_repo: Arc<dyn UsageRepository>,
    gateway: Arc<dyn PaymentGateway>,
    min_deposit: Decimal,
}

impl BillingService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        usage_repo: Arc<dyn UsageRepository>,
        gateway: Arc<dyn PaymentGateway>,
        min_deposit: Decimal,
    ) -> Self {
        Self {
            user_repo,
            transaction_repo,
            usage_repo,
            gateway,
            min_deposit,
        }
    }
}

#[async_trait]
pub trait BillingServiceApi: Send + Sync {
    async fn get_balance(&self, user_id: Uuid) -> Result<BalanceResponse, BillingServiceError>;

    /// Open a provider order for a balance top-up and record it as pending
    async fn create_deposit(
        &self,
        user_id: Uuid,
        amount: &serde_json::Value,
    ) -> Result<DepositResponse, BillingServiceError>;

    /// Capture the order and credit the balance exactly once
    async fn verify_deposit(
        &self,
        user_id: Uuid,
        order_id: &str,
    ) -> Result<VerifyDepositResponse, BillingServiceError>;

    async fn check_operation(
        &self,
        user_id: Uuid,
        operation: Option<&str>,
    ) -> Result<OperationCheckResponse, BillingServiceError>;

    async fn process_operation(
        &self,
        user_id: Uuid,
        operation: Option<&str>,
    ) -> Result<OperationResponse, BillingServiceError>;

    /// Provider reported the capture completed. Returns false when the
    /// deposit for the order was already credited or does not exist.
    async fn complete_deposit_from_provider(&self, order_id: &str) -> Result<bool, BillingServiceError>;

    /// Provider reported the capture denied
    async fn fail_deposit_from_provider(&self, order_id: &str) -> Result<bool, BillingServiceError>;
}

#[async_trait]
impl BillingServiceApi for BillingService {
    async fn get_balance(&self, user_id: Uuid) -> Result<BalanceResponse, BillingServiceError> {
        let user = self.find_user(user_id).await?;
        let now = Utc::now();
        let quota = Quota::at(user.free_operations_used, user.free_operations_reset, now);

        let transactions = self
            .transaction_repo
            .recent_for_user(user_id, RECENT_TRANSACTIONS)
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;

        let month_start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .unwrap_or_else(|| now.date_naive());
        let counts = self
            .usage_repo
            .usage_since(user_id, month_start)
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;
        let (total_operations, operation_counts) = BalanceResponse::usage_totals(&counts);

        Ok(BalanceResponse {
            success: true,
            balance: user.balance,
            free_operations_used: quota.used,
            free_operations_remaining: quota.remaining(),
            free_operations_total: quota.total(),
            next_reset_date: quota.next_reset,
            transactions: transactions.into_iter().map(TransactionView::from).collect(),
            total_operations,
            operation_counts,
        })
    }

    async fn create_deposit(
        &self,
        user_id: Uuid,
        amount: &serde_json::Value,
    ) -> Result<DepositResponse, BillingServiceError> {
        let amount = parse_amount(amount)?;
        if amount < self.min_deposit {
            return Err(BillingServiceError::Invalid(format!(
                "Minimum deposit amount is ${:.2}",
                self.min_deposit
            )));
        }

        let user = self.find_user(user_id).await?;
        let description = format!("Balance Deposit for {}", user.display_name());

        let session = self
            .gateway
            .create_order(user_id, amount, &description)
            .await?;

        self.transaction_repo
            .create_pending_deposit(user_id, amount, &session.external_id, Utc::now())
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;

        tracing::info!(
            user_id = %user_id,
            order_id = %session.external_id,
            amount = %amount,
            "Deposit order created"
        );

        Ok(DepositResponse {
            success: true,
            checkout_url: session.approval_url,
            order_id: session.external_id,
            message: "Please complete the payment process on PayPal".to_string(),
        })
    }

    async fn verify_deposit(
        &self,
        user_id: Uuid,
        order_id: &str,
    ) -> Result<VerifyDepositResponse, BillingServiceError> {
        if order_id.trim().is_empty() {
            return Err(BillingServiceError::Invalid("Order ID is required".to_string()));
        }

        let transaction = self
            .transaction_repo
            .find_for_user_by_payment_id(user_id, order_id)
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?
            .ok_or_else(|| BillingServiceError::NotFound("Transaction not found".to_string()))?;

        match transaction.status {
            TransactionStatus::Completed => return self.already_processed(&transaction).await,
            TransactionStatus::Failed => {
                return Err(BillingServiceError::Invalid(
                    "Payment failed or was canceled".to_string(),
                ))
            }
            TransactionStatus::Pending => {}
        }

        let capture = self.gateway.capture_order(order_id).await?;

        match capture {
            OrderCapture::Confirmed { amount } => {
                if amount != transaction.amount {
                    tracing::warn!(
                        user_id = %user_id,
                        order_id = %order_id,
                        expected = %transaction.amount,
                        captured = %amount,
                        "Captured amount differs from pending deposit"
                    );
                }

                let completed = self
                    .transaction_repo
                    .complete_deposit(transaction.id, amount, "Deposit - completed", Utc::now())
                    .await
                    .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;

                let Some(completed) = completed else {
                    // Credited by the webhook in the meantime
                    return self.already_processed(&transaction).await;
                };

                tracing::info!(
                    user_id = %user_id,
                    order_id = %order_id,
                    amount = %amount,
                    new_balance = %completed.balance_after,
                    "Deposit credited"
                );

                Ok(VerifyDepositResponse {
                    success: true,
                    message: "Payment completed successfully".to_string(),
                    amount,
                    new_balance: completed.balance_after,
                })
            }
            OrderCapture::Pending { status } => {
                tracing::info!(user_id = %user_id, order_id = %order_id, status = %status, "Deposit not approved yet");
                Err(BillingServiceError::Invalid(
                    "Payment has not been approved yet".to_string(),
                ))
            }
            OrderCapture::Failed { reason } => {
                self.transaction_repo
                    .mark_failed(transaction.id, Utc::now())
                    .await
                    .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;
                tracing::warn!(user_id = %user_id, order_id = %order_id, reason = %reason, "Deposit capture failed");
                Err(BillingServiceError::Invalid(
                    "Payment failed or was canceled".to_string(),
                ))
            }
        }
    }

    async fn check_operation(
        &self,
        user_id: Uuid,
        operation: Option<&str>,
    ) -> Result<OperationCheckResponse, BillingServiceError> {
        let operation = quota::operation_name(operation).map_err(BillingServiceError::Invalid)?;
        let user = self.find_user(user_id).await?;
        let quota = Quota::at(user.free_operations_used, user.free_operations_reset, Utc::now());

        let has_free_operations = quota.remaining() > 0;
        let has_balance = user.balance >= OPERATION_COST;
        let can_perform = has_free_operations || has_balance;

        Ok(OperationCheckResponse {
            success: true,
            operation,
            can_perform,
            has_free_operations,
            free_operations_remaining: quota.remaining(),
            has_balance,
            current_balance: user.balance,
            error: (!can_perform).then(|| insufficient_message(user.balance)),
        })
    }

    async fn process_operation(
        &self,
        user_id: Uuid,
        operation: Option<&str>,
    ) -> Result<OperationResponse, BillingServiceError> {
        let operation = quota::operation_name(operation).map_err(BillingServiceError::Invalid)?;

        let charge = self
            .usage_repo
            .record_operation(user_id, &operation, Utc::now())
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?
            .ok_or_else(|| BillingServiceError::NotFound("User not found".to_string()))?;

        let (used_free_operation, cost, account) = match charge {
            Charge::Free {
                remaining, balance, ..
            } => (
                true,
                Decimal::ZERO,
                AccountState {
                    free_operations_remaining: remaining,
                    current_balance: balance,
                },
            ),
            Charge::Balance { new_balance } => (
                false,
                OPERATION_COST,
                AccountState {
                    free_operations_remaining: 0,
                    current_balance: new_balance,
                },
            ),
            Charge::Insufficient { balance } => {
                tracing::info!(user_id = %user_id, operation = %operation, "Operation rejected, insufficient balance");
                return Err(BillingServiceError::PaymentRequired(insufficient_message(balance)));
            }
        };

        tracing::debug!(
            user_id = %user_id,
            operation = %operation,
            used_free_operation,
            "Operation charged"
        );

        Ok(OperationResponse {
            success: true,
            operation: OperationCharge {
                operation_type: operation,
                used_free_operation,
                cost,
            },
            account,
        })
    }

    async fn complete_deposit_from_provider(&self, order_id: &str) -> Result<bool, BillingServiceError> {
        let Some(transaction) = self.deposit_by_order(order_id, Transaction::is_settleable).await? else {
            return Ok(false);
        };

        let completed = self
            .transaction_repo
            .complete_deposit(
                transaction.id,
                transaction.amount,
                "Deposit - completed (webhook)",
                Utc::now(),
            )
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;

        if let Some(completed) = &completed {
            tracing::info!(
                user_id = %completed.user_id,
                order_id = %order_id,
                amount = %completed.amount,
                new_balance = %completed.balance_after,
                "Deposit credited from webhook"
            );
        }
        Ok(completed.is_some())
    }

    async fn fail_deposit_from_provider(&self, order_id: &str) -> Result<bool, BillingServiceError> {
        let Some(transaction) = self.deposit_by_order(order_id, Transaction::is_pending).await? else {
            return Ok(false);
        };

        let failed = self
            .transaction_repo
            .mark_failed(transaction.id, Utc::now())
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;

        if failed {
            tracing::info!(user_id = %transaction.user_id, order_id = %order_id, "Deposit marked failed from webhook");
        }
        Ok(failed)
    }
}

impl BillingService {
    async fn find_user(&self, user_id: Uuid) -> Result<User, BillingServiceError> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?
            .ok_or_else(|| BillingServiceError::NotFound("User not found".to_string()))
    }

    async fn deposit_by_order(
        &self,
        order_id: &str,
        accept: fn(&Transaction) -> bool,
    ) -> Result<Option<Transaction>, BillingServiceError> {
        let transaction = self
            .transaction_repo
            .find_by_payment_id(order_id)
            .await
            .map_err(|e| BillingServiceError::Dependency(e.to_string()))?;

        match transaction {
            Some(tx) if accept(&tx) => Ok(Some(tx)),
            Some(_) => Ok(None),
            None => {
                tracing::warn!(order_id = %order_id, "No deposit found for provider order");
                Ok(None)
            }
        }
    }

    async fn already_processed(
        &self,
        transaction: &Transaction,
    ) -> Result<VerifyDepositResponse, BillingServiceError> {
        let user = self.find_user(transaction.user_id).await?;
        Ok(VerifyDepositResponse {
            success: true,
            message: "Payment already processed".to_string(),
            amount: transaction.amount,
            new_balance: user.balance,
        })
    }
}

fn insufficient_message(balance: Decimal) -> String {
    format!(
        "Insufficient balance. Required: ${:.3}, Available: ${:.2}",
        OPERATION_COST, balance
    )
}

/// Positive amount from a JSON number or numeric string, rounded to cents
fn parse_amount(value: &serde_json::Value) -> Result<Decimal, BillingServiceError> {
    let invalid = || BillingServiceError::Invalid("Invalid deposit amount".to_string());

    let raw = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return Err(invalid()),
    };

    let amount = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| invalid())?
        .round_dp(2);

    if amount <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(amount)
}
