//! Free-operation allowance and per-operation pricing.
//!
//! Pure helpers: storage applies the outcome, these only decide it.

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use rust_decimal::Decimal;

pub const FREE_OPERATIONS_MONTHLY: i32 = 500;

/// 0.005 USD per operation once the free allowance is used up
pub const OPERATION_COST: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

pub const DEFAULT_OPERATION: &str = "general";
const MAX_OPERATION_LEN: usize = 64;

/// Midnight UTC on the first day of the month after `now`
pub fn first_day_of_next_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Step `date` forward by whole months until it lies after `now`
pub fn advance_monthly(date: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let mut next = date;
    while next <= now {
        match next.checked_add_months(Months::new(1)) {
            Some(d) => next = d,
            None => return first_day_of_next_month(now),
        }
    }
    next
}

/// Allowance as seen at `now`. A passed reset date reads as a full allowance
/// even before the reset is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub used: i32,
    pub next_reset: DateTime<Utc>,
    /// Stored counters are stale and should be rewritten on the next charge
    pub reset_due: bool,
}

impl Quota {
    pub fn at(used: i32, reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if reset_at <= now {
            Self {
                used: 0,
                next_reset: first_day_of_next_month(now),
                reset_due: true,
            }
        } else {
            Self {
                used,
                next_reset: reset_at,
                reset_due: false,
            }
        }
    }

    pub fn total(&self) -> i32 {
        FREE_OPERATIONS_MONTHLY
    }

    pub fn remaining(&self) -> i32 {
        (FREE_OPERATIONS_MONTHLY - self.used).max(0)
    }
}

/// How a single metered operation gets paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    /// Covered by the monthly allowance; the balance is left as is
    Free {
        used: i32,
        remaining: i32,
        balance: Decimal,
    },
    /// Deducted from the prepaid balance
    Balance { new_balance: Decimal },
    Insufficient { balance: Decimal },
}

/// Free operations first, then balance. Never drives the balance negative.
pub fn decide_charge(quota: &Quota, balance: Decimal) -> Charge {
    if quota.remaining() > 0 {
        let used = quota.used + 1;
        return Charge::Free {
            used,
            remaining: (FREE_OPERATIONS_MONTHLY - used).max(0),
            balance,
        };
    }
    if balance >= OPERATION_COST {
        return Charge::Balance {
            new_balance: balance - OPERATION_COST,
        };
    }
    Charge::Insufficient { balance }
}

/// Normalize a client-supplied operation name. Missing or blank means `general`.
pub fn operation_name(raw: Option<&str>) -> Result<String, String> {
    let name = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_OPERATION);

    let valid = name.len() <= MAX_OPERATION_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if !valid {
        return Err("Invalid operation type".to_string());
    }
    Ok(name.to_string())
}
