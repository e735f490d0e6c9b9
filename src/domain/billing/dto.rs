use super::model::{OperationCount, Transaction, TransactionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Body of POST /api/user/deposit. The amount may arrive as a number or a string.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    #[serde(default)]
    pub amount: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub success: bool,
    pub checkout_url: String,
    pub order_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDepositRequest {
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDepositResponse {
    pub success: bool,
    pub message: String,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Uuid,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionView {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            balance_after: tx.balance_after,
            description: tx.description,
            status: tx.status,
            payment_id: tx.payment_id,
            created_at: tx.created_at,
        }
    }
}

/// Response for GET /api/user/balance
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub success: bool,
    pub balance: Decimal,
    pub free_operations_used: i32,
    pub free_operations_remaining: i32,
    pub free_operations_total: i32,
    pub next_reset_date: DateTime<Utc>,
    pub transactions: Vec<TransactionView>,
    pub total_operations: i64,
    pub operation_counts: BTreeMap<String, i64>,
}

impl BalanceResponse {
    pub fn usage_totals(counts: &[OperationCount]) -> (i64, BTreeMap<String, i64>) {
        let map: BTreeMap<String, i64> = counts
            .iter()
            .map(|c| (c.operation.clone(), c.count))
            .collect();
        (map.values().sum(), map)
    }
}

/// Body of POST /api/operations/check and /api/operations/process
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub operation_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCheckResponse {
    pub success: bool,
    pub operation: String,
    pub can_perform: bool,
    pub has_free_operations: bool,
    pub free_operations_remaining: i32,
    pub has_balance: bool,
    pub current_balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCharge {
    #[serde(rename = "type")]
    pub operation_type: String,
    pub used_free_operation: bool,
    pub cost: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    pub free_operations_remaining: i32,
    pub current_balance: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResponse {
    pub success: bool,
    pub operation: OperationCharge,
    pub account: AccountState,
}
