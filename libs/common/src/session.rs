//! Generation session
//!
//! A [`StudioSession`] is the explicit context for one user: it owns the
//! credit ledger, the gallery and the single active-generation slot, and it
//! drives the flow capability check → reserve → submit → poll → settle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capability::CapabilityGate;
use crate::error::{GenerationError, GenerationResult};
use crate::gallery::Gallery;
use crate::ledger::{CreditLedger, Reservation};
use crate::models::{GeneratedVideo, GenerationJob, GenerationRequest};
use crate::orchestrator::JobOrchestrator;
use crate::script::ScriptAssist;

#[derive(Debug)]
struct ActiveGeneration {
    operation: Option<String>,
    cost: u64,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
}

type Slot = Arc<Mutex<Option<ActiveGeneration>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<ActiveGeneration>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frees the active-generation slot when dropped
#[derive(Debug)]
struct SlotGuard {
    slot: Slot,
}

impl SlotGuard {
    fn set_operation(&self, operation: &str) {
        if let Some(active) = lock(&self.slot).as_mut() {
            active.operation = Some(operation.to_string());
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        lock(&self.slot).take();
    }
}

/// What the session is doing right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Generating {
        /// Remote operation, once submission went through
        operation: Option<String>,
        cost: u64,
        started_at: DateTime<Utc>,
    },
}

#[derive(Clone)]
pub struct StudioSession {
    ledger: CreditLedger,
    gallery: Gallery,
    orchestrator: JobOrchestrator,
    capability: CapabilityGate,
    scripts: ScriptAssist,
    active: Slot,
}

impl StudioSession {
    pub fn new(
        ledger: CreditLedger,
        orchestrator: JobOrchestrator,
        capability: CapabilityGate,
        scripts: ScriptAssist,
    ) -> Self {
        Self {
            ledger,
            gallery: Gallery::new(),
            orchestrator,
            capability,
            scripts,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn capability(&self) -> &CapabilityGate {
        &self.capability
    }

    pub fn status(&self) -> SessionStatus {
        match lock(&self.active).as_ref() {
            Some(active) => SessionStatus::Generating {
                operation: active.operation.clone(),
                cost: active.cost,
                started_at: active.started_at,
            },
            None => SessionStatus::Idle,
        }
    }

    /// Stop waiting for the active job; returns false when idle
    pub fn cancel_active(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(active) => {
                info!(operation = ?active.operation, "Cancelling active generation");
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn balance(&self) -> i64 {
        self.ledger.balance().await
    }

    /// Gallery snapshot, newest first
    pub async fn videos(&self) -> Vec<GeneratedVideo> {
        self.gallery.list().await
    }

    /// Simulated payment; returns the credits added
    pub async fn top_up(&self, payment_amount: u64) -> GenerationResult<u64> {
        self.ledger.top_up(payment_amount).await
    }

    pub async fn draft_script(&self, topic: &str) -> Option<String> {
        self.scripts.draft(topic).await
    }

    /// Run one generation end to end
    pub async fn generate(&self, request: GenerationRequest) -> GenerationResult<GeneratedVideo> {
        self.begin(request).await?.complete().await
    }

    /// Reserve credits and submit `request`.
    ///
    /// Submission failures are refunded here, before any polling.
    pub async fn begin(&self, request: GenerationRequest) -> GenerationResult<PendingGeneration> {
        self.capability.ensure().await?;

        let cost = request.cost();
        let cancel = CancellationToken::new();
        let slot = self.claim(cost, cancel.clone())?;

        let reservation = self.ledger.try_reserve(cost).await?;
        let balance = self.ledger.balance().await;
        info!(cost, balance, "Reserved credits for generation");

        let job = match self.orchestrator.submit(&request).await {
            Ok(job) => job,
            Err(e) => {
                warn!("Submission failed, refunding {} credits", cost);
                self.ledger.refund(reservation).await;
                return Err(e);
            }
        };
        slot.set_operation(&job.operation);

        Ok(PendingGeneration {
            job,
            request,
            cost,
            reservation: Some(reservation),
            cancel,
            ledger: self.ledger.clone(),
            gallery: self.gallery.clone(),
            orchestrator: self.orchestrator.clone(),
            _slot: slot,
        })
    }

    fn claim(&self, cost: u64, cancel: CancellationToken) -> GenerationResult<SlotGuard> {
        let mut active = lock(&self.active);
        if active.is_some() {
            return Err(GenerationError::JobInFlight);
        }

        *active = Some(ActiveGeneration {
            operation: None,
            cost,
            started_at: Utc::now(),
            cancel,
        });

        Ok(SlotGuard {
            slot: self.active.clone(),
        })
    }
}

/// A submitted job whose outcome has not been consumed yet.
///
/// Dropping it abandons the job: the remote keeps running and the
/// reservation is settled as debited.
pub struct PendingGeneration {
    job: GenerationJob,
    request: GenerationRequest,
    cost: u64,
    reservation: Option<Reservation>,
    cancel: CancellationToken,
    ledger: CreditLedger,
    gallery: Gallery,
    orchestrator: JobOrchestrator,
    _slot: SlotGuard,
}

impl std::fmt::Debug for PendingGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingGeneration")
            .field("job", &self.job)
            .field("request", &self.request)
            .field("cost", &self.cost)
            .field("reservation", &self.reservation)
            .finish_non_exhaustive()
    }
}

impl PendingGeneration {
    pub fn job(&self) -> &GenerationJob {
        &self.job
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Wait for the remote outcome, then commit or refund the reservation
    pub async fn complete(mut self) -> GenerationResult<GeneratedVideo> {
        let outcome = self
            .orchestrator
            .await_completion(&mut self.job, &self.cancel)
            .await;

        let reservation = self.reservation.take();
        match outcome {
            Ok(uri) => {
                if let Some(reservation) = reservation {
                    self.ledger.commit(reservation).await;
                }
                let video =
                    GeneratedVideo::new(&self.request, uri, self.orchestrator.model_name());
                self.gallery.push(video.clone()).await;
                info!(id = %video.id, "Generated video added to gallery");
                Ok(video)
            }
            Err(e) => {
                warn!(error = %e, "Generation failed, refunding {} credits", self.cost);
                if let Some(reservation) = reservation {
                    self.ledger.refund(reservation).await;
                }
                Err(e)
            }
        }
    }
}

impl Drop for PendingGeneration {
    fn drop(&mut self) {
        if let Some(reservation) = self.reservation.take() {
            warn!(
                operation = %self.job.operation,
                "Generation abandoned, keeping {} credits debited",
                self.cost
            );
            self.ledger.abandon(reservation);
        }
    }
}
