//! Session with the running ETABS instance.

use crate::api::{AutomationBackend, EtabsApplication};
use crate::config::ConnectionConfig;
use std::time::Duration;
use tracing::{debug, info};

/// Tracks whether a session with the application is open.
///
/// The application handle is owned here exclusively. It is created lazily on
/// first need and never torn down: the application outlives this process.
pub struct ConnectionManager {
    // Declared before `backend` so the handle is released first.
    application: Option<Box<dyn EtabsApplication>>,
    connected: bool,
    backend: Box<dyn AutomationBackend>,
    startup_delay: Duration,
}

impl ConnectionManager {
    /// Create a manager over `backend`. No connection is made yet.
    pub fn new(backend: Box<dyn AutomationBackend>, config: &ConnectionConfig) -> Self {
        Self {
            application: None,
            connected: false,
            backend,
            startup_delay: config.startup_delay,
        }
    }

    /// Check if the automation interface is registered on this host.
    ///
    /// Does not require the application to be running.
    pub fn is_installed(&self) -> bool {
        self.backend.is_installed()
    }

    /// Check if an instance is currently running.
    pub fn is_running(&self) -> bool {
        self.backend.is_running().unwrap_or_else(|e| {
            debug!("Running probe failed: {}", e);
            false
        })
    }

    /// Start a new instance unless one is already running.
    ///
    /// Returns true if an instance is running afterwards.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return true;
        }

        info!("Starting ETABS");
        match self.backend.create() {
            Ok(application) => {
                self.application = Some(application);
                self.connected = true;
                if !self.startup_delay.is_zero() {
                    debug!("Waiting {:?} for ETABS to initialize", self.startup_delay);
                    std::thread::sleep(self.startup_delay);
                }
                true
            }
            Err(e) => {
                debug!("Could not start ETABS: {}", e);
                false
            }
        }
    }

    /// Attach to a running instance. Idempotent once attached.
    pub fn try_connect(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }

        match self.backend.attach() {
            Ok(application) => {
                debug!("Attached to running ETABS instance");
                self.application = Some(application);
                self.connected = true;
                true
            }
            Err(e) => {
                debug!("Could not attach to ETABS: {}", e);
                self.application = None;
                self.connected = false;
                false
            }
        }
    }

    /// Make sure the application is running and attached.
    ///
    /// Tries to attach first, then starts a new instance and attaches.
    pub fn ensure_available(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }

        if self.try_connect() {
            return true;
        }

        if !self.start() {
            return false;
        }

        self.try_connect()
    }

    /// Check if a live handle is held.
    pub fn is_connected(&self) -> bool {
        self.connected && self.application.is_some()
    }

    /// Mark the session as closed. The application itself keeps running.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Application handle, if connected.
    pub fn application(&self) -> Option<&dyn EtabsApplication> {
        if self.connected {
            self.application.as_deref()
        } else {
            None
        }
    }

    /// Mutable application handle, if connected.
    pub fn application_mut(&mut self) -> Option<&mut (dyn EtabsApplication + 'static)> {
        if self.connected {
            self.application.as_deref_mut()
        } else {
            None
        }
    }
}
