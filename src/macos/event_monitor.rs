//! Global input event monitors.
//!
//! A monitor registration is a process-wide resource. [`MonitorSubscription`]
//! owns one registration and removes it exactly once, either through
//! [`MonitorSubscription::close`] or on drop.

use crate::models::scroll_event::{EventMask, InputEvent};
use crate::{Result, TitleSwipeError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, trace, warn};

/// Callback invoked for every matching event
pub type EventHandler = Box<dyn FnMut(&InputEvent) + Send + 'static>;

/// Opaque identifier of a registered monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonitorToken(u64);

impl fmt::Display for MonitorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor#{}", self.0)
    }
}

/// Source of global (whole-desktop) input events
pub trait EventMonitor: Send + Sync {
    /// Register `handler` for every event matching `mask`
    fn add_global_monitor(&self, mask: EventMask, handler: EventHandler) -> Result<MonitorToken>;

    /// Remove a previously registered monitor
    fn remove_monitor(&self, token: MonitorToken) -> Result<()>;
}

/// Owns a single monitor registration
pub struct MonitorSubscription {
    monitor: Arc<dyn EventMonitor>,
    token: Option<MonitorToken>,
}

impl fmt::Debug for MonitorSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorSubscription")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl MonitorSubscription {
    pub fn register(
        monitor: Arc<dyn EventMonitor>,
        mask: EventMask,
        handler: EventHandler,
    ) -> Result<Self> {
        let token = monitor.add_global_monitor(mask, handler)?;
        debug!(%token, "Registered global event monitor");
        Ok(Self {
            monitor,
            token: Some(token),
        })
    }

    pub fn token(&self) -> Option<MonitorToken> {
        self.token
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    /// Remove the registration now and report failures
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        match self.token.take() {
            Some(token) => {
                self.monitor.remove_monitor(token)?;
                debug!(%token, "Removed global event monitor");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for MonitorSubscription {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("Failed to remove event monitor: {}", err);
        }
    }
}

struct Registration {
    mask: EventMask,
    handler: Arc<Mutex<EventHandler>>,
}

/// In-process event monitor. Events are injected with [`LocalEventMonitor::post`]
/// and delivered serially on the posting thread.
#[derive(Default)]
pub struct LocalEventMonitor {
    registrations: RwLock<BTreeMap<MonitorToken, Registration>>,
    next_token: AtomicU64,
}

impl fmt::Debug for LocalEventMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEventMonitor")
            .field("monitors", &self.monitor_count())
            .finish()
    }
}

impl LocalEventMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn monitor_count(&self) -> usize {
        self.registrations.read().expect("poisoned lock").len()
    }

    /// Deliver an event to every matching monitor. Returns how many handlers ran.
    pub fn post(&self, event: &InputEvent) -> usize {
        let kind = event.kind();
        // Collect first so handlers may add or remove monitors while running
        let handlers: Vec<Arc<Mutex<EventHandler>>> = {
            let registrations = self.registrations.read().expect("poisoned lock");
            registrations
                .values()
                .filter(|registration| registration.mask.matches(kind))
                .map(|registration| Arc::clone(&registration.handler))
                .collect()
        };

        trace!(%kind, handlers = handlers.len(), "Dispatching event");
        for handler in &handlers {
            let mut handler = handler.lock().expect("poisoned lock");
            (*handler)(event);
        }
        handlers.len()
    }
}

impl EventMonitor for LocalEventMonitor {
    fn add_global_monitor(&self, mask: EventMask, handler: EventHandler) -> Result<MonitorToken> {
        let token = MonitorToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.registrations.write().expect("poisoned lock").insert(
            token,
            Registration {
                mask,
                handler: Arc::new(Mutex::new(handler)),
            },
        );
        Ok(token)
    }

    fn remove_monitor(&self, token: MonitorToken) -> Result<()> {
        match self
            .registrations
            .write()
            .expect("poisoned lock")
            .remove(&token)
        {
            Some(_) => Ok(()),
            None => Err(TitleSwipeError::MonitorNotRegistered(token.to_string()).into()),
        }
    }
}
