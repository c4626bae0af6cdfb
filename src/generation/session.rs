//! The generation flow of one signed-in tenant.
//!
//! `GenerationSession` owns every piece of mutable flow state: the wizard, the
//! outstanding job, history, the balance cache, the gate and the display list. All
//! mutation goes through `&mut self`, so the session is driven from a single task and
//! needs no locking.

use super::backend::{GenerationBackend, PhoneNumberRequest};
use super::error::GenerationError;
use super::gate::{normalize_phone_number, GatingResolver, Resolution};
use super::history::History;
use super::listener::{match_record, result_from_record, ListenOutcome, ResultRecord};
use super::progress::{ProgressHandle, ProgressSimulator, PROGRESS_COMPLETE};
use super::store::ResultStore;
use super::submitter::JobSubmitter;
use super::types::{GenerationKind, GenerationResult, HistoryItem, JobHandle};
use super::wizard::{Wizard, WizardStep};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    BriefReady(String),
    JobSubmitted(JobHandle),
    /// A result is ready to be shown.
    ResultReleased(GenerationResult),
    /// A result is held; the UI should ask for a phone number.
    CapturePrompt(JobHandle),
    /// The account is out of tokens; the UI should open billing.
    BillingRedirect,
    BalanceUpdated(i64),
    /// A failure to show to the user.
    Notification(String),
}

/// Holds the one job the session is waiting for. Set once per job, cleared once.
#[derive(Debug, Default)]
pub struct JobSlot(Option<JobHandle>);

impl JobSlot {
    pub fn current(&self) -> Option<&JobHandle> {
        self.0.as_ref()
    }

    /// Stores `handle` unless another job is already in flight.
    pub fn set(&mut self, handle: JobHandle) -> Result<(), JobHandle> {
        match &self.0 {
            Some(current) => Err(current.clone()),
            None => {
                self.0 = Some(handle);
                Ok(())
            }
        }
    }

    /// Clears the slot if it holds `handle`.
    pub fn clear(&mut self, handle: &JobHandle) -> bool {
        if self.0.as_ref() == Some(handle) {
            self.0 = None;
            true
        } else {
            false
        }
    }

    pub fn take(&mut self) -> Option<JobHandle> {
        self.0.take()
    }
}

pub struct GenerationSession {
    tenant_id: String,
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn ResultStore>,
    wizard: Wizard,
    outstanding: JobSlot,
    history: History,
    balance: Option<i64>,
    gate: GatingResolver,
    display: Vec<GenerationResult>,
    simulator: ProgressSimulator,
    progress: Arc<watch::Sender<u8>>,
    progress_task: Option<ProgressHandle>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl GenerationSession {
    /// Creates a session and the receiver for its events.
    ///
    /// `has_contact_info` is the cached gate state of the account.
    pub fn new(
        tenant_id: impl Into<String>,
        kind: GenerationKind,
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn ResultStore>,
        simulator: ProgressSimulator,
        has_contact_info: bool,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (progress, _) = watch::channel(0);

        let session = Self {
            tenant_id: tenant_id.into(),
            backend,
            store,
            wizard: Wizard::new(kind),
            outstanding: JobSlot::default(),
            history: History::new(),
            balance: None,
            gate: GatingResolver::new(has_contact_info),
            display: Vec::new(),
            simulator,
            progress: Arc::new(progress),
            progress_task: None,
            events,
        };
        (session, receiver)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut Wizard {
        &mut self.wizard
    }

    /// Starts over with an empty wizard for `kind`.
    pub fn reset_wizard(&mut self, kind: GenerationKind) {
        self.wizard = Wizard::new(kind);
    }

    pub fn outstanding(&self) -> Option<&JobHandle> {
        self.outstanding.current()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Last balance reported by the backend, if any.
    pub fn balance(&self) -> Option<i64> {
        self.balance
    }

    /// Results released for display, oldest first.
    pub fn display(&self) -> &[GenerationResult] {
        &self.display
    }

    /// Results waiting for contact info.
    pub fn held(&self) -> &[GenerationResult] {
        self.gate.held()
    }

    pub fn has_contact_info(&self) -> bool {
        self.gate.is_satisfied()
    }

    /// Subscribes to the progress percentage of the current job.
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.events.send(event);
    }

    /// Tells the user about `err` without touching job state.
    fn notify(&self, err: GenerationError) -> GenerationError {
        if err.is_insufficient_balance() {
            self.emit(SessionEvent::BillingRedirect);
        }
        self.emit(SessionEvent::Notification(err.to_string()));
        err
    }

    /// Abandons the in-flight job so a new attempt can be made, then notifies.
    fn fail(&mut self, err: GenerationError) -> GenerationError {
        if let Some(handle) = self.outstanding.take() {
            tracing::warn!(job_id = %handle, error = %err, "Generation failed");
        }
        self.stop_progress(0);
        self.notify(err)
    }

    fn update_balance(&mut self, balance: i64) {
        self.balance = Some(balance);
        self.emit(SessionEvent::BalanceUpdated(balance));
    }

    fn stop_progress(&mut self, value: u8) {
        if let Some(task) = self.progress_task.take() {
            task.cancel();
        }
        self.progress.send_replace(value);
    }

    /// Validates the current wizard step and moves on, drafting a brief when
    /// entering the concept step.
    pub async fn advance(&mut self) -> Result<WizardStep, GenerationError> {
        let entering_concept = self.wizard.step().next() == Some(WizardStep::Concept);

        match self.wizard.advance(self.backend.as_ref(), &self.tenant_id).await {
            Ok(step) => {
                if entering_concept && step == WizardStep::Concept {
                    self.emit(SessionEvent::BriefReady(self.wizard.prompt().to_string()));
                }
                Ok(step)
            }
            Err(err) => Err(self.notify(err)),
        }
    }

    /// Submits the wizard's request and starts the progress indicator.
    ///
    /// Only one job may be in flight per session.
    pub async fn generate(&mut self) -> Result<JobHandle, GenerationError> {
        if let Some(current) = self.outstanding.current() {
            let err =
                GenerationError::Submission(format!("job {} is already in flight", current));
            return Err(self.notify(err));
        }

        let request = match self.wizard.submit() {
            Ok(request) => request,
            Err(err) => return Err(self.notify(err.into())),
        };
        let kind = request.kind();

        let submission = JobSubmitter::new(self.backend.as_ref(), &self.tenant_id)
            .submit(request)
            .await;

        let submission = match submission {
            Ok(submission) => submission,
            Err(err) => {
                if let GenerationError::InsufficientBalance {
                    balance: Some(balance),
                } = &err
                {
                    self.update_balance(*balance);
                }
                return Err(self.fail(err));
            }
        };

        if let Some(balance) = submission.balance {
            self.update_balance(balance);
        }

        let handle = submission.handle;
        if let Err(current) = self.outstanding.set(handle.clone()) {
            let err =
                GenerationError::Submission(format!("job {} is already in flight", current));
            return Err(self.notify(err));
        }

        tracing::info!(tenant_id = %self.tenant_id, job_id = %handle, %kind, "Job submitted");
        self.progress_task = Some(self.simulator.start(kind, self.progress.clone()));
        self.emit(SessionEvent::JobSubmitted(handle.clone()));
        Ok(handle)
    }

    /// Feeds one result-collection change into the session.
    ///
    /// Changes for other jobs, partial records and changes arriving after the job
    /// has been resolved are ignored. Returns the result when this change completes
    /// the outstanding job.
    pub fn handle_record(&mut self, record: &ResultRecord) -> Option<GenerationResult> {
        let handle = self.outstanding.current()?.clone();

        match match_record(&handle, record) {
            ListenOutcome::Unrelated => None,
            ListenOutcome::Pending => {
                tracing::debug!(job_id = %handle, "Result record not complete yet");
                None
            }
            ListenOutcome::Completed(result) => {
                self.complete(result.clone());
                Some(result)
            }
        }
    }

    fn complete(&mut self, result: GenerationResult) {
        if !self.outstanding.clear(&result.job_id) {
            return;
        }
        self.stop_progress(PROGRESS_COMPLETE);
        self.history.upsert_front(HistoryItem::from(&result));

        tracing::info!(job_id = %result.job_id, images = result.images.len(), "Job completed");

        match self.gate.resolve(result) {
            Some(Resolution::Release(result)) => self.release(result),
            Some(Resolution::Hold) => {
                if let Some(held) = self.gate.held().last() {
                    self.emit(SessionEvent::CapturePrompt(held.job_id.clone()));
                }
            }
            None => {}
        }
    }

    fn release(&mut self, result: GenerationResult) {
        self.display.push(result.clone());
        self.emit(SessionEvent::ResultReleased(result));
    }

    /// Subscribes to the result collection and waits for the outstanding job.
    ///
    /// A subscription failure or an ended stream abandons the job; there is no
    /// reconnection. Dropping the returned future tears the subscription down
    /// without affecting the backend job.
    pub async fn await_result(&mut self) -> Result<GenerationResult, GenerationError> {
        let Some(handle) = self.outstanding.current().cloned() else {
            return Err(self.notify(GenerationError::NoOutstandingJob));
        };

        let mut stream = match self.store.subscribe(&self.tenant_id).await {
            Ok(stream) => stream,
            Err(err) => return Err(self.fail(GenerationError::Listener(err.to_string()))),
        };
        tracing::debug!(job_id = %handle, "Listening for result");

        while let Some(item) = stream.next().await {
            match item {
                Ok(record) => {
                    if let Some(result) = self.handle_record(&record) {
                        return Ok(result);
                    }
                }
                Err(err) => return Err(self.fail(err)),
            }
        }

        Err(self.fail(GenerationError::Listener(
            "result subscription closed".to_string(),
        )))
    }

    /// Submits the wizard's request and waits for its result.
    pub async fn run(&mut self) -> Result<GenerationResult, GenerationError> {
        self.generate().await?;
        self.await_result().await
    }

    /// Sends the phone number for the gate. On success every held result is
    /// released, unchanged.
    pub async fn submit_phone_number(
        &mut self,
        phone_number: &str,
    ) -> Result<Vec<GenerationResult>, GenerationError> {
        let phone_number = match normalize_phone_number(phone_number) {
            Ok(phone_number) => phone_number,
            Err(err) => return Err(self.notify(err.into())),
        };

        let request = PhoneNumberRequest {
            tenant_id: self.tenant_id.clone(),
            phone_number,
        };

        let response = match self.backend.submit_phone_number(&request).await {
            Ok(response) => response,
            Err(err) => {
                return Err(self.notify(GenerationError::SupplementaryInfoFailed(err.to_string())))
            }
        };

        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| "phone number was not accepted".to_string());
            return Err(self.notify(GenerationError::SupplementaryInfoFailed(message)));
        }

        let released = self.gate.mark_satisfied();
        tracing::info!(
            tenant_id = %self.tenant_id,
            released = released.len(),
            "Contact info captured"
        );
        for result in &released {
            self.release(result.clone());
        }
        Ok(released)
    }

    /// Rebuilds history from the stored results of the tenant.
    pub async fn hydrate_history(&mut self) -> Result<usize, GenerationError> {
        let records = match self.store.list(&self.tenant_id).await {
            Ok(records) => records,
            Err(err) => return Err(self.notify(err)),
        };

        let items: Vec<HistoryItem> = records
            .iter()
            .filter_map(result_from_record)
            .map(|result| HistoryItem::from(&result))
            .collect();

        self.history.replace_all(items);
        tracing::debug!(
            tenant_id = %self.tenant_id,
            items = self.history.len(),
            "History hydrated"
        );
        Ok(self.history.len())
    }

    /// Removes a history entry locally.
    pub fn remove_history(&mut self, job_id: &JobHandle) -> Option<HistoryItem> {
        self.history.remove(job_id)
    }

    /// Closes the generation UI: stops progress and forgets the in-flight job.
    /// The backend job itself keeps running.
    pub fn close(&mut self) {
        if let Some(handle) = self.outstanding.take() {
            tracing::info!(job_id = %handle, "Session closed with a job in flight");
        }
        self.stop_progress(0);
    }
}
