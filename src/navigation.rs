use crate::drag_gestures::page::{NavigationEvent, NavigationSource};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// Debounces client-side route changes into single re-evaluations.
pub struct NavigationObserver {
    receiver: Option<Receiver<NavigationEvent>>,
    delay: Duration,
    due_at: Option<Instant>,
}

impl NavigationObserver {
    pub fn new(delay: Duration) -> Self {
        Self {
            receiver: None,
            delay,
            due_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.due_at
    }

    pub fn start(&mut self, source: &mut dyn NavigationSource) -> anyhow::Result<()> {
        if self.receiver.is_some() {
            return Ok(());
        }
        let (tx, rx) = mpsc::channel();
        source.subscribe(tx)?;
        self.receiver = Some(rx);
        Ok(())
    }

    pub fn stop(&mut self, source: &mut dyn NavigationSource) -> anyhow::Result<()> {
        self.due_at = None;
        if self.receiver.take().is_some() {
            source.unsubscribe()?;
        }
        Ok(())
    }

    /// Record a route change seen at `now`, pushing the deadline back.
    pub fn notify(&mut self, now: Instant) {
        self.due_at = Some(now + self.delay);
    }

    /// Drain notifications and report whether a re-evaluation is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut disconnected = false;
        let mut seen = Vec::new();
        if let Some(rx) = &self.receiver {
            loop {
                match rx.try_recv() {
                    Ok(event) => seen.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        if let Some(last) = seen.last() {
            tracing::debug!(?last, count = seen.len(), "route change noticed");
            self.notify(now);
        }
        if disconnected {
            tracing::warn!("navigation source went away");
            self.receiver = None;
        }
        match self.due_at {
            Some(at) if now >= at => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }
}
