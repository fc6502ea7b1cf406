//! Authoring session: drives one machine and carries out its effects
//!
//! The session owns the debounce timer and the in-flight lookup as Tokio
//! tasks. Both report back through an unbounded channel as internal
//! [`MachineEvent`]s tagged with the [`FetchTicket`] they were started
//! under; the reducer drops anything stale.
//!
//! Sessions are independent: nothing is shared between two sessions except
//! the lookup service they may both hold.

use crate::config::DetourConfig;
use crate::error::{LookupError, SnapshotError};
use crate::event::{DetourEvent, FetchTicket, MachineEvent};
use crate::lookup::{fetch_for_route, RoutePatternLookup};
use crate::machine::{DetourMachine, Effect};
use crate::snapshot::DetourSnapshot;
use crate::state::DetourState;
use crate::types::{DetourContext, DetourInput, RouteId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One in-progress detour
pub struct DetourSession {
    machine: DetourMachine,
    lookup: Arc<dyn RoutePatternLookup>,
    config: DetourConfig,
    sender: mpsc::UnboundedSender<MachineEvent>,
    receiver: mpsc::UnboundedReceiver<MachineEvent>,
    debounce: Option<(FetchTicket, JoinHandle<()>)>,
    fetch: Option<(FetchTicket, JoinHandle<()>)>,
    last_lookup_error: Option<LookupError>,
}

impl std::fmt::Debug for DetourSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetourSession")
            .field("machine", &self.machine)
            .field("config", &self.config)
            .field("debounce", &self.debounce.as_ref().map(|(ticket, _)| ticket))
            .field("fetch", &self.fetch.as_ref().map(|(ticket, _)| ticket))
            .field("last_lookup_error", &self.last_lookup_error)
            .finish_non_exhaustive()
    }
}

impl DetourSession {
    /// Start a new session
    ///
    /// Must be called within a Tokio runtime: entering `Pick Route ID`
    /// spawns the debounce timer.
    pub fn start(
        input: DetourInput,
        lookup: Arc<dyn RoutePatternLookup>,
        config: DetourConfig,
    ) -> Self {
        let (machine, effects) = DetourMachine::new(input);
        let mut session = Self::with_machine(machine, lookup, config);
        session.apply(effects);
        session
    }

    /// Resume a session from a validated snapshot
    ///
    /// No effects run on restore. A snapshot taken while the lookup was
    /// pending resumes in `Idle`/`Loading` with nothing outstanding; the
    /// caller re-selects the route to fetch again.
    ///
    /// # Errors
    /// `SnapshotError::RejectedByMachine` if the snapshot is inconsistent.
    pub fn restore(
        snapshot: DetourSnapshot,
        lookup: Arc<dyn RoutePatternLookup>,
        config: DetourConfig,
    ) -> Result<Self, SnapshotError> {
        let machine = DetourMachine::restore(snapshot)?;
        Ok(Self::with_machine(machine, lookup, config))
    }

    fn with_machine(
        machine: DetourMachine,
        lookup: Arc<dyn RoutePatternLookup>,
        config: DetourConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            machine,
            lookup,
            config,
            sender,
            receiver,
            debounce: None,
            fetch: None,
            last_lookup_error: None,
        }
    }

    /// Send a caller event; returns whether it was handled
    pub fn send(&mut self, event: DetourEvent) -> bool {
        let outcome = self.machine.send(event);
        self.apply(outcome.effects);
        outcome.handled
    }

    /// Send an untyped event, silently dropping anything unrecognized
    pub fn send_value(&mut self, value: &serde_json::Value) -> bool {
        match DetourEvent::from_value(value) {
            Some(event) => self.send(event),
            None => false,
        }
    }

    /// Apply the next internal event
    ///
    /// Returns `false` without waiting when no timer or lookup is
    /// outstanding.
    pub async fn process_next(&mut self) -> bool {
        if !self.has_pending_lookup() {
            return false;
        }
        let Some(event) = self.receiver.recv().await else {
            return false;
        };
        self.dispatch_internal(event);
        true
    }

    /// Process internal events until no lookup work is outstanding
    ///
    /// Waits for as long as the lookup service takes unless a lookup
    /// timeout is configured.
    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    /// Check whether a timer or lookup is still outstanding
    #[inline]
    #[must_use]
    pub fn has_pending_lookup(&self) -> bool {
        self.debounce.is_some() || self.fetch.is_some()
    }

    /// Current machine state
    #[inline]
    #[must_use]
    pub fn state(&self) -> DetourState {
        self.machine.state()
    }

    /// Current machine context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &DetourContext {
        self.machine.context()
    }

    /// The driven machine
    #[inline]
    #[must_use]
    pub fn machine(&self) -> &DetourMachine {
        &self.machine
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DetourConfig {
        &self.config
    }

    /// Error of the most recent lookup for the current ticket, if it failed
    #[inline]
    #[must_use]
    pub fn last_lookup_error(&self) -> Option<&LookupError> {
        self.last_lookup_error.as_ref()
    }

    /// Capture the machine for persistence
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> DetourSnapshot {
        self.machine.snapshot()
    }

    fn dispatch_internal(&mut self, event: MachineEvent) {
        let current = self.machine.ticket();
        match &event {
            MachineEvent::LookupDebounceElapsed { ticket } => {
                if self.debounce.as_ref().is_some_and(|(armed, _)| armed == ticket) {
                    self.debounce = None;
                }
            }
            MachineEvent::RoutePatternsLoaded { ticket, .. } => {
                if self.fetch.as_ref().is_some_and(|(started, _)| started == ticket) {
                    self.fetch = None;
                }
                if *ticket == current {
                    self.last_lookup_error = None;
                }
            }
            MachineEvent::RoutePatternsFailed { ticket, reason } => {
                if self.fetch.as_ref().is_some_and(|(started, _)| started == ticket) {
                    self.fetch = None;
                }
                if *ticket == current {
                    self.last_lookup_error = Some(reason.clone());
                }
            }
            MachineEvent::Detour(_) => {}
        }
        let outcome = self.machine.send(event);
        self.apply(outcome.effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelLookup => self.cancel_lookup(),
                Effect::ScheduleLookupDebounce { ticket } => self.schedule_debounce(ticket),
                Effect::FetchRoutePatterns { ticket, route_id } => {
                    self.start_fetch(ticket, route_id);
                }
            }
        }
    }

    fn cancel_lookup(&mut self) {
        if let Some((ticket, handle)) = self.debounce.take() {
            tracing::trace!(%ticket, "debounce cancelled");
            handle.abort();
        }
        if let Some((ticket, handle)) = self.fetch.take() {
            tracing::debug!(%ticket, "route pattern lookup superseded");
            handle.abort();
        }
    }

    fn schedule_debounce(&mut self, ticket: FetchTicket) {
        let delay = self.config.lookup_debounce();
        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(MachineEvent::LookupDebounceElapsed { ticket });
        });
        if let Some((_, previous)) = self.debounce.replace((ticket, handle)) {
            previous.abort();
        }
    }

    fn start_fetch(&mut self, ticket: FetchTicket, route_id: Option<RouteId>) {
        let lookup = Arc::clone(&self.lookup);
        let sender = self.sender.clone();
        let limit = self.config.lookup_timeout();
        let handle = tokio::spawn(async move {
            let fetch = fetch_for_route(lookup.as_ref(), route_id.as_ref());
            let result = match limit {
                Some(limit) => tokio::time::timeout(limit, fetch)
                    .await
                    .unwrap_or_else(|_| {
                        Err(LookupError::TimedOut {
                            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        })
                    }),
                None => fetch.await,
            };
            let event = match result {
                Ok(route_patterns) => MachineEvent::RoutePatternsLoaded {
                    ticket,
                    route_patterns,
                },
                Err(reason) => {
                    if reason == LookupError::NoRouteId {
                        tracing::error!(%ticket, "route pattern lookup invoked without a route id");
                    }
                    MachineEvent::RoutePatternsFailed { ticket, reason }
                }
            };
            let _ = sender.send(event);
        });
        if let Some((_, previous)) = self.fetch.replace((ticket, handle)) {
            previous.abort();
        }
    }
}

impl Drop for DetourSession {
    fn drop(&mut self) {
        self.cancel_lookup();
    }
}
