use std::{
    future::Future,
    sync::{Arc, Weak},
    time::Duration,
};

use shared::{
    domain::{DomainCatalog, DomainId},
    protocol::{FileCommand, SystemCommand},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dispatcher::{classify, examples_text, CommandKind},
    engine::{EngineClient, EngineError},
    error::SessionError,
    messages::Messages,
    transcript::{EntryId, EntryKind, TranscriptEntry, TranscriptLog},
};

const DEFAULT_PULSE_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub pulse_interval: Duration,
    /// `None` leaves remote calls unbounded.
    pub request_timeout: Option<Duration>,
    pub event_capacity: usize,
    pub messages: Messages,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pulse_interval: DEFAULT_PULSE_INTERVAL,
            request_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            messages: Messages::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainState {
    Unselected,
    Activating(DomainId),
    Active(DomainId),
    ActivationFailed { domain: DomainId, error: String },
}

impl DomainState {
    pub fn active_domain(&self) -> Option<&DomainId> {
        match self {
            DomainState::Active(domain) => Some(domain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TranscriptChanged,
    DomainChanged(DomainState),
    PendingChanged(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated(DomainId),
    Failed { domain: DomainId, reason: String },
    /// A newer activation, `clear` or `shutdown` happened first; nothing was written.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Cleared,
    ExamplesShown,
    Answered(String),
    ConnectionFailed { reason: String },
    /// The session was cleared or shut down before the engine answered.
    Discarded,
}

struct PendingRequest {
    token: u64,
    entry_id: EntryId,
    pulse: JoinHandle<()>,
}

struct InFlightActivation {
    generation: u64,
    domain: DomainId,
    entry_id: EntryId,
}

struct SessionState {
    transcript: TranscriptLog,
    domain: DomainState,
    activation: Option<InFlightActivation>,
    activation_generation: u64,
    pending: Option<PendingRequest>,
    request_token: u64,
    expanded: bool,
    shut_down: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            transcript: TranscriptLog::new(),
            domain: DomainState::Unselected,
            activation: None,
            activation_generation: 0,
            pending: None,
            request_token: 0,
            expanded: false,
            shut_down: false,
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.shut_down {
            return Err(SessionError::ShutDown);
        }
        Ok(())
    }

    /// Forgets every in-flight operation so that late responses find nothing to update.
    fn cancel_in_flight(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.pulse.abort();
            self.transcript.remove(&pending.entry_id);
        }
        if let Some(activation) = self.activation.take() {
            self.transcript.remove(&activation.entry_id);
            if self.domain == DomainState::Activating(activation.domain) {
                self.domain = DomainState::Unselected;
            }
        }
    }
}

/// Drives one conversational session against the engine: domain activation,
/// command dispatch and the transcript the view renders from.
pub struct SessionController {
    session_id: Uuid,
    engine: Arc<dyn EngineClient>,
    catalog: DomainCatalog,
    config: SessionConfig,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(engine: Arc<dyn EngineClient>, catalog: DomainCatalog) -> Arc<Self> {
        Self::with_config(engine, catalog, SessionConfig::default())
    }

    pub fn with_config(
        engine: Arc<dyn EngineClient>,
        catalog: DomainCatalog,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Arc::new(Self {
            session_id: Uuid::new_v4(),
            engine,
            catalog,
            config,
            inner: Mutex::new(SessionState::new()),
            events,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn catalog(&self) -> &DomainCatalog {
        &self.catalog
    }

    pub fn messages(&self) -> &Messages {
        &self.config.messages
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.lock().await.transcript.entries().to_vec()
    }

    pub async fn domain_state(&self) -> DomainState {
        self.inner.lock().await.domain.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.inner.lock().await.pending.is_some()
    }

    pub async fn is_expanded(&self) -> bool {
        self.inner.lock().await.expanded
    }

    pub async fn toggle_expanded(&self) -> bool {
        let mut guard = self.inner.lock().await;
        guard.expanded = !guard.expanded;
        guard.expanded
    }

    pub async fn activate_domain(&self, domain_id: &str) -> Result<ActivationOutcome, SessionError> {
        let domain = match self.catalog.resolve(domain_id) {
            Ok(descriptor) => descriptor.id.clone(),
            Err(err) => {
                warn!(session = %self.session_id, domain = domain_id, "refusing activation: {err}");
                return Err(err.into());
            }
        };

        let generation = {
            let mut guard = self.inner.lock().await;
            guard.ensure_live()?;
            if let Some(previous) = guard.activation.take() {
                guard.transcript.remove(&previous.entry_id);
                debug!(
                    session = %self.session_id,
                    superseded = %previous.domain,
                    generation = previous.generation,
                    "activation superseded"
                );
            }
            guard.activation_generation += 1;
            let generation = guard.activation_generation;
            let entry_id = guard
                .transcript
                .push_pending(EntryKind::Loading, self.config.messages.loading(&domain));
            guard.domain = DomainState::Activating(domain.clone());
            guard.activation = Some(InFlightActivation {
                generation,
                domain: domain.clone(),
                entry_id,
            });
            generation
        };
        self.notify(SessionEvent::TranscriptChanged);
        self.notify(SessionEvent::DomainChanged(DomainState::Activating(
            domain.clone(),
        )));
        info!(session = %self.session_id, %domain, generation, "activating domain");

        let result = self
            .call_engine(self.engine.select_domain(&domain))
            .await;

        let mut guard = self.inner.lock().await;
        let current = matches!(&guard.activation, Some(flight) if flight.generation == generation);
        let Some(flight) = current.then(|| guard.activation.take()).flatten() else {
            debug!(session = %self.session_id, %domain, generation, "discarding stale activation response");
            return Ok(ActivationOutcome::Superseded);
        };

        match result {
            Ok(body) => {
                let text = body
                    .message_text()
                    .map(str::to_string)
                    .unwrap_or_else(|| self.config.messages.loaded(&domain));
                guard
                    .transcript
                    .replace(&flight.entry_id, EntryKind::Message, text);
                guard.domain = DomainState::Active(domain.clone());
                drop(guard);
                info!(session = %self.session_id, %domain, "domain active");
                self.notify(SessionEvent::TranscriptChanged);
                self.notify(SessionEvent::DomainChanged(DomainState::Active(
                    domain.clone(),
                )));
                Ok(ActivationOutcome::Activated(domain))
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(session = %self.session_id, %domain, error = %reason, "domain activation failed");
                guard.transcript.replace(
                    &flight.entry_id,
                    EntryKind::Error,
                    self.config.messages.load_failed(&domain, &reason),
                );
                // Failure is reported, then the session falls back so no command
                // can run as if the domain were loaded.
                let failed = DomainState::ActivationFailed {
                    domain: domain.clone(),
                    error: reason.clone(),
                };
                guard.domain = DomainState::Unselected;
                drop(guard);
                self.notify(SessionEvent::TranscriptChanged);
                self.notify(SessionEvent::DomainChanged(failed));
                self.notify(SessionEvent::DomainChanged(DomainState::Unselected));
                Ok(ActivationOutcome::Failed { domain, reason })
            }
        }
    }

    pub async fn dispatch(
        self: &Arc<Self>,
        command_text: &str,
    ) -> Result<DispatchOutcome, SessionError> {
        let (token, domain) = {
            let mut guard = self.inner.lock().await;
            guard.ensure_live()?;
            if guard.pending.is_some() {
                warn!(session = %self.session_id, "refusing dispatch while a request is pending");
                return Err(SessionError::RequestPending);
            }

            match classify(command_text) {
                CommandKind::Empty => {
                    warn!(session = %self.session_id, "refusing empty command");
                    return Err(SessionError::EmptyCommand);
                }
                CommandKind::Clear => {
                    guard.transcript.clear();
                    guard.expanded = false;
                    drop(guard);
                    self.notify(SessionEvent::TranscriptChanged);
                    return Ok(DispatchOutcome::Cleared);
                }
                CommandKind::Examples => {
                    let active = guard
                        .domain
                        .active_domain()
                        .and_then(|domain| self.catalog.get(domain.as_str()));
                    let text = examples_text(&self.config.messages, &self.catalog, active);
                    guard.transcript.push_system(EntryKind::Message, text);
                    drop(guard);
                    self.notify(SessionEvent::TranscriptChanged);
                    return Ok(DispatchOutcome::ExamplesShown);
                }
                CommandKind::General => {}
            }

            let Some(domain) = guard.domain.active_domain().cloned() else {
                warn!(session = %self.session_id, "refusing command without an active domain");
                return Err(SessionError::NoActiveDomain);
            };

            // The user's own line is visible before the engine is contacted.
            guard.transcript.push_user(command_text);
            let entry_id = guard
                .transcript
                .push_pending(EntryKind::Thinking, self.config.messages.thinking.clone());
            guard.request_token += 1;
            let token = guard.request_token;
            let pulse = self.spawn_pulse(entry_id.clone());
            guard.pending = Some(PendingRequest {
                token,
                entry_id,
                pulse,
            });
            (token, domain)
        };
        self.notify(SessionEvent::TranscriptChanged);
        self.notify(SessionEvent::PendingChanged(true));
        debug!(session = %self.session_id, %domain, token, "evaluating command");

        let result = self.call_engine(self.engine.evaluate(command_text)).await;

        let mut guard = self.inner.lock().await;
        let current = matches!(&guard.pending, Some(pending) if pending.token == token);
        let Some(pending) = current.then(|| guard.pending.take()).flatten() else {
            debug!(session = %self.session_id, token, "discarding stale command response");
            return Ok(DispatchOutcome::Discarded);
        };
        pending.pulse.abort();
        guard.transcript.remove(&pending.entry_id);

        let outcome = match result {
            Ok(body) => {
                let text = body
                    .resolve_text()
                    .map(str::to_string)
                    .unwrap_or_else(|| self.config.messages.no_response.clone());
                guard.transcript.push_system(EntryKind::Message, text.clone());
                DispatchOutcome::Answered(text)
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(session = %self.session_id, %domain, error = %reason, "command evaluation failed");
                guard.transcript.push_system(
                    EntryKind::Error,
                    self.config.messages.connection_failed(&reason),
                );
                DispatchOutcome::ConnectionFailed { reason }
            }
        };
        drop(guard);
        self.notify(SessionEvent::TranscriptChanged);
        self.notify(SessionEvent::PendingChanged(false));
        Ok(outcome)
    }

    pub async fn dispatch_system(
        self: &Arc<Self>,
        command: SystemCommand,
    ) -> Result<DispatchOutcome, SessionError> {
        self.dispatch(command.query()).await
    }

    pub async fn dispatch_file(
        self: &Arc<Self>,
        command: FileCommand,
        file_name: &str,
    ) -> Result<DispatchOutcome, SessionError> {
        let Some(query) = command.render(file_name) else {
            warn!(session = %self.session_id, "refusing file command without a file name");
            return Err(SessionError::EmptyCommand);
        };
        self.dispatch(&query).await
    }

    /// Resets the session: empty transcript, no domain, nothing in flight.
    pub async fn clear(&self) {
        let had_pending = {
            let mut guard = self.inner.lock().await;
            let had_pending = guard.pending.is_some();
            guard.cancel_in_flight();
            guard.transcript.clear();
            guard.domain = DomainState::Unselected;
            guard.expanded = false;
            had_pending
        };
        info!(session = %self.session_id, "session cleared");
        self.notify(SessionEvent::TranscriptChanged);
        self.notify(SessionEvent::DomainChanged(DomainState::Unselected));
        if had_pending {
            self.notify(SessionEvent::PendingChanged(false));
        }
    }

    /// Ends the session. Later operations are refused and late responses dropped.
    pub async fn shutdown(&self) {
        {
            let mut guard = self.inner.lock().await;
            if guard.shut_down {
                return;
            }
            guard.cancel_in_flight();
            guard.shut_down = true;
        }
        info!(session = %self.session_id, "session shut down");
        self.notify(SessionEvent::TranscriptChanged);
    }

    async fn call_engine<T, F>(&self, call: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(EngineError::Timeout(limit))),
            None => call.await,
        }
    }

    fn spawn_pulse(self: &Arc<Self>, entry_id: EntryId) -> JoinHandle<()> {
        let controller: Weak<Self> = Arc::downgrade(self);
        let period = self.config.pulse_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            let mut dots = 1;
            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                dots = dots % 3 + 1;
                let frame = controller.config.messages.thinking_frame(dots);
                let updated = controller
                    .inner
                    .lock()
                    .await
                    .transcript
                    .set_text(&entry_id, frame);
                if !updated {
                    break;
                }
                controller.notify(SessionEvent::TranscriptChanged);
            }
        })
    }

    fn notify(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(pending) = self.inner.get_mut().pending.take() {
            pending.pulse.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
