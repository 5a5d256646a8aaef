use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::error::InferenceFailure;
use crate::models::{ImagePayload, NutritionalEstimate, UserProfile};
use crate::services::NutritionEstimator;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState {
    /// No image chosen yet.
    Idle,
    /// A call is in flight.
    Pending,
    Succeeded(NutritionalEstimate),
    Failed(InferenceFailure),
}

/// Generation number issued when an analysis begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// One user's profile plus the single current result-or-error slot.
#[derive(Debug)]
pub struct Session {
    profile: UserProfile,
    state: AnalysisState,
    generation: u64,
}

impl Session {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            state: AnalysisState::Idle,
            generation: 0,
        }
    }

    pub fn profile(&self) -> UserProfile {
        self.profile
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, AnalysisState::Pending)
    }

    /// Moves to `Pending`, discarding any previous result or error.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.state = AnalysisState::Pending;
        Ticket(self.generation)
    }

    /// Records the outcome of the call identified by `ticket`. Returns false and
    /// leaves the state untouched when a newer call has been issued since.
    pub fn settle(
        &mut self,
        ticket: Ticket,
        outcome: Result<NutritionalEstimate, InferenceFailure>,
    ) -> bool {
        if ticket.0 != self.generation || !self.is_pending() {
            log::warn!(
                "⏭️ Discarding stale analysis result (ticket {}, current {})",
                ticket.0,
                self.generation
            );
            return false;
        }

        self.state = match outcome {
            Ok(estimate) => AnalysisState::Succeeded(estimate),
            Err(failure) => AnalysisState::Failed(failure),
        };
        true
    }
}

/// Runs analyses for one session. A new submission aborts the call still in
/// flight; whatever that call might still deliver is rejected by its ticket.
pub struct Analyzer {
    estimator: Arc<dyn NutritionEstimator>,
    session: Arc<Mutex<Session>>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl Analyzer {
    pub fn new(estimator: Arc<dyn NutritionEstimator>, profile: UserProfile) -> Self {
        Self {
            estimator,
            session: Arc::new(Mutex::new(Session::new(profile))),
            in_flight: Mutex::new(None),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        // A poisoned lock still holds a consistent state: every write is one assignment.
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> AnalysisState {
        self.session().state().clone()
    }

    /// Starts analysing `image` and returns immediately.
    pub fn submit(&self, image: ImagePayload) -> Ticket {
        let (ticket, profile) = {
            let mut session = self.session();
            (session.begin(), session.profile())
        };

        let estimator = self.estimator.clone();
        let session = self.session.clone();
        let handle = tokio::spawn(async move {
            let outcome = estimator.estimate(image, profile).await;
            let mut session = session.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            session.settle(ticket, outcome);
        });

        let mut in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = in_flight.replace(handle) {
            if !previous.is_finished() {
                log::info!("🔁 New image submitted, cancelling previous analysis");
            }
            previous.abort();
        }

        ticket
    }

    /// Waits for the most recent submission to settle.
    pub async fn wait(&self) -> AnalysisState {
        let handle = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log::error!("❌ Analysis task failed: {}", e);
                }
            }
        }

        self.state()
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some(handle) = in_flight.take() {
                handle.abort();
            }
        }
    }
}
