//! Backend-independent arithmetic for the reserve / finalize / release cycle.
//!
//! Every ledger backend reads the account under its own exclusive lock, hands the
//! snapshot to these functions and persists whatever they return, so the quota
//! rules live in exactly one place.

use chrono::{DateTime, Duration, Utc};

use crate::{
    errors::{AppError, Result},
    models::{Tier, UsageSnapshot},
};

pub const USAGE_WINDOW_HOURS: i64 = 24;

/// Tokens held back for a paid request when the caller gives no estimate.
pub const DEFAULT_TOKEN_RESERVATION: i64 = 2000;

pub fn usage_window() -> Duration {
    Duration::hours(USAGE_WINDOW_HOURS)
}

/// True when no window has been opened yet or the current one is more than 24h old.
pub fn window_elapsed(reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match reset_at {
        None => true,
        Some(started) => now - started > usage_window(),
    }
}

/// Message count that applies right now, treating an elapsed window as already reset.
pub fn effective_usage(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> i32 {
    if window_elapsed(snapshot.daily_messages_reset_at, now) {
        0
    } else {
        snapshot.daily_messages_used
    }
}

/// End of the open window, or `None` when the next request starts a new one.
pub fn window_resets_at(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match snapshot.daily_messages_reset_at {
        Some(started) if !window_elapsed(Some(started), now) => Some(started + usage_window()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub updated: UsageSnapshot,
    pub daily_used: i32,
    pub tokens_reserved: Option<i64>,
}

pub fn admit(
    snapshot: &UsageSnapshot,
    tier: &Tier,
    free_tier_limit: i32,
    estimated_tokens: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Admission> {
    let elapsed = window_elapsed(snapshot.daily_messages_reset_at, now);
    let used = if elapsed { 0 } else { snapshot.daily_messages_used };

    let tokens_reserved = match tier {
        Tier::Free => {
            if used >= free_tier_limit {
                return Err(AppError::DailyLimitReached {
                    used,
                    limit: free_tier_limit,
                });
            }
            None
        }
        Tier::Paid => {
            let required = estimated_tokens.unwrap_or(DEFAULT_TOKEN_RESERVATION).max(0);
            if snapshot.token_balance < required {
                return Err(AppError::InsufficientBalance {
                    balance: snapshot.token_balance,
                    required,
                });
            }
            Some(required)
        }
        Tier::Other(_) => None,
    };

    let daily_used = used.saturating_add(1);
    let updated = UsageSnapshot {
        daily_messages_used: daily_used,
        daily_messages_reset_at: if elapsed {
            Some(now)
        } else {
            snapshot.daily_messages_reset_at
        },
        token_balance: match tokens_reserved {
            Some(reserved) => (snapshot.token_balance - reserved).max(0),
            None => snapshot.token_balance,
        },
    };

    Ok(Admission {
        updated,
        daily_used,
        tokens_reserved,
    })
}

/// Balance correction owed once the provider reports real usage: positive refunds an
/// over-estimate, negative charges the shortfall. `None` when nothing changes.
pub fn settlement_delta(
    tier: &Tier,
    tokens_reserved: Option<i64>,
    input_tokens: i64,
    output_tokens: i64,
) -> Option<i64> {
    if *tier != Tier::Paid {
        return None;
    }

    let reserved = tokens_reserved?;
    let difference = reserved - (input_tokens + output_tokens);
    (difference != 0).then_some(difference)
}

pub fn apply_settlement(token_balance: i64, delta: i64) -> i64 {
    (token_balance + delta).max(0)
}

/// Tokens handed back when a reservation is released.
pub fn release_refund(tier: &Tier, tokens_reserved: Option<i64>) -> i64 {
    match (tier, tokens_reserved) {
        (Tier::Paid, Some(reserved)) => reserved.max(0),
        _ => 0,
    }
}

pub fn release(snapshot: &UsageSnapshot, tier: &Tier, tokens_reserved: Option<i64>) -> UsageSnapshot {
    UsageSnapshot {
        daily_messages_used: (snapshot.daily_messages_used - 1).max(0),
        daily_messages_reset_at: snapshot.daily_messages_reset_at,
        token_balance: snapshot.token_balance + release_refund(tier, tokens_reserved),
    }
}
