use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Subscription class of an account. Only `Free` and `Paid` are metered; any other
/// stored value is carried through untouched and admitted without a quota check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tier {
    Free,
    Paid,
    Other(String),
}

impl Tier {
    pub fn as_str(&self) -> &str {
        match self {
            Tier::Free => "free",
            Tier::Paid => "paid",
            Tier::Other(name) => name,
        }
    }

    /// Bounded label for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Paid => "paid",
            Tier::Other(_) => "other",
        }
    }
}

impl From<String> for Tier {
    fn from(value: String) -> Self {
        match value.as_str() {
            "free" => Tier::Free,
            "paid" => Tier::Paid,
            _ => Tier::Other(value),
        }
    }
}

impl From<&str> for Tier {
    fn from(value: &str) -> Self {
        Tier::from(value.to_string())
    }
}

impl From<Tier> for String {
    fn from(tier: Tier) -> Self {
        tier.as_str().to_string()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The metering columns of an account, as read under the row lock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsageSnapshot {
    pub daily_messages_used: i32,
    pub daily_messages_reset_at: Option<DateTime<Utc>>,
    pub token_balance: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub tier: String,
    pub daily_messages_used: i32,
    pub daily_messages_reset_at: Option<DateTime<Utc>>,
    pub token_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub tier: Tier,
    pub usage: UsageSnapshot,
}

impl Account {
    pub fn new(id: Uuid, tier: Tier) -> Self {
        Self {
            id,
            tier,
            usage: UsageSnapshot::default(),
        }
    }

    pub fn with_token_balance(mut self, token_balance: i64) -> Self {
        self.usage.token_balance = token_balance;
        self
    }

    pub fn with_daily_usage(mut self, used: i32, reset_at: Option<DateTime<Utc>>) -> Self {
        self.usage.daily_messages_used = used;
        self.usage.daily_messages_reset_at = reset_at;
        self
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            tier: Tier::from(row.tier),
            usage: UsageSnapshot {
                daily_messages_used: row.daily_messages_used,
                daily_messages_reset_at: row.daily_messages_reset_at,
                token_balance: row.token_balance,
            },
        }
    }
}
