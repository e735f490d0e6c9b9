use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which sweep a cron invocation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    All,
    Expire,
    Remind,
    ResetUsage,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::All => "all",
            JobKind::Expire => "expire",
            JobKind::Remind => "remind",
            JobKind::ResetUsage => "reset-usage",
        }
    }

    pub fn includes(&self, other: JobKind) -> bool {
        *self == JobKind::All || *self == other
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(JobKind::All),
            "expire" => Ok(JobKind::Expire),
            "remind" => Ok(JobKind::Remind),
            "reset-usage" => Ok(JobKind::ResetUsage),
            other => Err(format!("Unknown job: {}", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CronQuery {
    pub job: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpireReport {
    pub expired: u32,
    pub stale_checkouts_settled: u32,
    pub emails_failed: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindReport {
    pub reminders_sent: u32,
    pub emails_failed: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetUsageReport {
    pub users_reset: u64,
    pub subscriptions_reset: u32,
    pub usage_rows_archived: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire: Option<ExpireReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remind: Option<RemindReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_usage: Option<ResetUsageReport>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronResponse {
    pub success: bool,
    pub job: String,
    pub ran_at: DateTime<Utc>,
    pub results: JobReport,
}
