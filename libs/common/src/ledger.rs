//! Optimistic credit ledger
//!
//! Credits are debited before a job is submitted and handed back if the job
//! fails. The pending total tracks debits that are neither committed nor
//! refunded yet.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{GenerationError, GenerationResult};

/// Payment units are converted at a fixed rate
pub const CREDITS_PER_PAYMENT_UNIT: u64 = 10;

/// Balance granted to a fresh session
pub const WELCOME_CREDITS: i64 = 100;

/// Credit amounts beyond `i64::MAX` cannot be represented in the balance
fn signed(credits: u64) -> i64 {
    i64::try_from(credits).unwrap_or(i64::MAX)
}

#[derive(Debug)]
struct LedgerState {
    balance: i64,
    pending: u64,
}

/// A debit taken for one job; settle it with [`CreditLedger::commit`] or
/// [`CreditLedger::refund`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation must be committed or refunded"]
pub struct Reservation {
    cost: u64,
}

impl Reservation {
    pub fn cost(&self) -> u64 {
        self.cost
    }
}

/// Credit balance of a single session
#[derive(Debug, Clone)]
pub struct CreditLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for CreditLedger {
    fn default() -> Self {
        Self::new(WELCOME_CREDITS)
    }
}

impl CreditLedger {
    pub fn new(initial_balance: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                balance: initial_balance,
                pending: 0,
            })),
        }
    }

    pub async fn balance(&self) -> i64 {
        self.state.lock().await.balance
    }

    /// Credits debited for jobs that have not settled yet
    pub async fn pending(&self) -> u64 {
        self.state.lock().await.pending
    }

    /// Debit `cost` without checking the balance.
    ///
    /// Callers are expected to have checked affordability already.
    pub async fn reserve(&self, cost: u64) -> Reservation {
        let mut state = self.state.lock().await;
        state.balance = state.balance.saturating_sub(signed(cost));
        state.pending = state.pending.saturating_add(cost);

        if state.balance < 0 {
            warn!("Ledger balance went negative: {}", state.balance);
        }

        Reservation { cost }
    }

    /// Check and debit in one step so the balance never drops below zero
    pub async fn try_reserve(&self, cost: u64) -> GenerationResult<Reservation> {
        let mut state = self.state.lock().await;

        let debit = match i64::try_from(cost) {
            Ok(debit) if debit <= state.balance => debit,
            _ => {
                return Err(GenerationError::InsufficientCredits {
                    required: cost,
                    available: state.balance,
                });
            }
        };

        state.balance -= debit;
        state.pending = state.pending.saturating_add(cost);

        Ok(Reservation { cost })
    }

    /// Keep the debit; the job succeeded
    pub async fn commit(&self, reservation: Reservation) {
        let mut state = self.state.lock().await;
        state.pending = state.pending.saturating_sub(reservation.cost);
    }

    /// Hand the debit back; the job failed
    pub async fn refund(&self, reservation: Reservation) {
        let mut state = self.state.lock().await;
        state.balance = state.balance.saturating_add(signed(reservation.cost));
        state.pending = state.pending.saturating_sub(reservation.cost);
        info!(
            "Refunded {} credits, balance is now {}",
            reservation.cost, state.balance
        );
    }

    /// Settle a reservation from synchronous code, keeping the debit.
    ///
    /// Used when a job is abandoned without an outcome. Falls back to a
    /// spawned commit when the ledger is busy.
    pub fn abandon(&self, reservation: Reservation) {
        match self.state.try_lock() {
            Ok(mut state) => {
                state.pending = state.pending.saturating_sub(reservation.cost);
            }
            Err(_) => match Handle::try_current() {
                Ok(handle) => {
                    let ledger = self.clone();
                    handle.spawn(async move { ledger.commit(reservation).await });
                }
                Err(_) => warn!(
                    "Could not settle {} abandoned credits outside a runtime",
                    reservation.cost
                ),
            },
        }
    }

    /// Simulated payment; returns the number of credits added.
    ///
    /// Rejects amounts whose credits would not fit in the balance, leaving it
    /// untouched.
    pub async fn top_up(&self, payment_amount: u64) -> GenerationResult<u64> {
        let too_large = || {
            GenerationError::InvalidRequest(format!(
                "Top-up of {} payment units is too large",
                payment_amount
            ))
        };

        let credits = payment_amount
            .checked_mul(CREDITS_PER_PAYMENT_UNIT)
            .ok_or_else(too_large)?;

        let mut state = self.state.lock().await;
        state.balance = i64::try_from(credits)
            .ok()
            .and_then(|credits| state.balance.checked_add(credits))
            .ok_or_else(too_large)?;

        info!("Added {} credits, balance is now {}", credits, state.balance);
        Ok(credits)
    }
}
