// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connection state machine for one Bluetooth receipt printer.
//
// Disconnected → Connecting → Connected, with Connecting → Error on failure
// and Connected → Disconnected on teardown. Error is not terminal: the next
// `connect` starts over from Connecting.
//
// Opening a link walks a candidate chain: every serial-profile identifier in
// `PROTOCOL_CANDIDATES` is tried in order, each a bounded number of times
// with a linearly growing pause, and the first socket that opens wins. An
// error that retrying cannot fix skips straight to the next candidate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use bondrucker_bridge::{BluetoothAdapter, BondState, PROTOCOL_CANDIDATES, PrinterConnection};
use bondrucker_core::config::ConnectionSettings;
use bondrucker_core::error::{BondruckerError, Result};
use bondrucker_core::repository::PrinterSettingsSink;
use bondrucker_core::types::{PrinterConfig, PrinterStatus, PrinterType};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::retry::{RetryConfig, RetryDecision, should_retry};

/// Capacity of the status-change broadcast. Slow subscribers lag, they do
/// not block transitions.
const STATUS_EVENT_CAPACITY: usize = 64;

/// One status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub address: String,
    pub status: PrinterStatus,
}

// ---------------------------------------------------------------------------
// Status board
// ---------------------------------------------------------------------------

/// Current status of every device the manager has touched.
///
/// Entries are created on first access and live as long as the board.
/// Shared between the connection manager (writer) and the scanner (reader).
pub struct StatusBoard {
    devices: Mutex<HashMap<String, watch::Sender<PrinterStatus>>>,
    changes: broadcast::Sender<StatusChange>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(STATUS_EVENT_CAPACITY);
        Self {
            devices: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// Current status; `Disconnected` for devices never seen.
    pub fn get(&self, address: &str) -> PrinterStatus {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .map(|tx| *tx.borrow())
            .unwrap_or_default()
    }

    /// Per-device watch, created on first access.
    pub fn watch(&self, address: &str) -> watch::Receiver<PrinterStatus> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address.to_string())
            .or_insert_with(|| watch::channel(PrinterStatus::Disconnected).0)
            .subscribe()
    }

    /// Stream of every transition on every device.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    /// Record `status`. Only actual transitions are broadcast.
    pub fn set(&self, address: &str, status: PrinterStatus) {
        let changed = self
            .devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address.to_string())
            .or_insert_with(|| watch::channel(PrinterStatus::Disconnected).0)
            .send_if_modified(|current| {
                if *current == status {
                    false
                } else {
                    *current = status;
                    true
                }
            });

        if changed {
            debug!(address, ?status, "printer status changed");
            // No subscribers is fine.
            let _ = self.changes.send(StatusChange {
                address: address.to_string(),
                status,
            });
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Connection manager
// ---------------------------------------------------------------------------

struct ActiveLink {
    address: String,
    connection: Arc<dyn PrinterConnection>,
}

/// Owns the single printer link of a manager instance.
pub struct ConnectionManager {
    adapter: Arc<dyn BluetoothAdapter>,
    settings: ConnectionSettings,
    statuses: Arc<StatusBoard>,
    settings_sink: Option<Arc<dyn PrinterSettingsSink>>,
    /// Serialises connect/disconnect so only one link is ever being built.
    gate: tokio::sync::Mutex<()>,
    active: Mutex<Option<ActiveLink>>,
}

impl ConnectionManager {
    pub fn new(
        adapter: Arc<dyn BluetoothAdapter>,
        settings: ConnectionSettings,
        statuses: Arc<StatusBoard>,
    ) -> Self {
        Self {
            adapter,
            settings,
            statuses,
            settings_sink: None,
            gate: tokio::sync::Mutex::new(()),
            active: Mutex::new(None),
        }
    }

    /// Report connection state changes to `sink`.
    pub fn with_settings_sink(mut self, sink: Arc<dyn PrinterSettingsSink>) -> Self {
        self.settings_sink = Some(sink);
        self
    }

    pub fn statuses(&self) -> &Arc<StatusBoard> {
        &self.statuses
    }

    pub fn status(&self, address: &str) -> PrinterStatus {
        self.statuses.get(address)
    }

    pub fn watch_status(&self, address: &str) -> watch::Receiver<PrinterStatus> {
        self.statuses.watch(address)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.statuses.subscribe()
    }

    /// The live link, whichever device it belongs to.
    pub fn active_connection(&self) -> Option<Arc<dyn PrinterConnection>> {
        self.lock_active()
            .as_ref()
            .map(|link| Arc::clone(&link.connection))
    }

    /// The live link if it belongs to `address`.
    pub fn connection_for(&self, address: &str) -> Option<Arc<dyn PrinterConnection>> {
        self.lock_active()
            .as_ref()
            .filter(|link| link.address == address)
            .map(|link| Arc::clone(&link.connection))
    }

    /// Bring the link to `config`'s device up. Returns `true` once the
    /// device is `Connected`; failures are logged and leave it in `Error`.
    #[instrument(skip(self, config), fields(address = %config.address))]
    pub async fn connect(&self, config: &PrinterConfig) -> bool {
        let address = config.address.as_str();
        let _gate = self.gate.lock().await;

        if self.statuses.get(address) == PrinterStatus::Connected {
            if let Some(connection) = self.connection_for(address) {
                if connection.is_connected().await {
                    debug!("already connected");
                    return true;
                }
            }
            debug!("link went away, reconnecting");
            self.statuses.set(address, PrinterStatus::Disconnected);
        }

        if config.printer_type != PrinterType::Bluetooth {
            let err = BondruckerError::UnsupportedPrinterType(config.printer_type);
            warn!(error = %err, "refusing to connect");
            self.statuses.set(address, PrinterStatus::Connecting);
            self.statuses.set(address, PrinterStatus::Error);
            return false;
        }

        if let Err(e) = self.adapter.cancel_discovery().await {
            debug!(error = %e, "could not cancel discovery before connecting");
        }
        self.statuses.set(address, PrinterStatus::Connecting);
        info!(printer = config.display_name(), "connecting");

        match self.establish(address).await {
            Ok(connection) => {
                *self.lock_active() = Some(ActiveLink {
                    address: address.to_string(),
                    connection,
                });
                self.statuses.set(address, PrinterStatus::Connected);
                self.notify_sink(true).await;
                info!("printer connected");
                true
            }
            Err(e) => {
                error!(error = %e, "connection failed");
                self.statuses.set(address, PrinterStatus::Error);
                false
            }
        }
    }

    /// Close the link to `config`'s device and mark it `Disconnected`.
    /// Safe to call repeatedly.
    #[instrument(skip(self, config), fields(address = %config.address))]
    pub async fn disconnect(&self, config: &PrinterConfig) {
        let address = config.address.as_str();
        let _gate = self.gate.lock().await;

        let link = {
            let mut active = self.lock_active();
            if active.as_ref().is_some_and(|link| link.address == address) {
                active.take()
            } else {
                None
            }
        };
        if let Some(link) = link {
            if let Err(e) = link.connection.close().await {
                warn!(error = %e, "error while closing printer link");
            }
            info!("printer disconnected");
        }
        self.statuses.set(address, PrinterStatus::Disconnected);
        self.notify_sink(false).await;
    }

    // -- internal helpers ---------------------------------------------------

    async fn establish(&self, address: &str) -> Result<Arc<dyn PrinterConnection>> {
        if !self.adapter.is_enabled().await {
            return Err(BondruckerError::BluetoothUnavailable);
        }
        let device = self
            .adapter
            .remote_device(address)
            .await?
            .ok_or_else(|| BondruckerError::DeviceNotFound(address.to_string()))?;

        if !device.bonded {
            self.pair(address).await?;
        }

        self.release_active().await;
        self.open_first_candidate(address).await
    }

    /// Request a bond and wait for the host to confirm it.
    async fn pair(&self, address: &str) -> Result<()> {
        info!("device not bonded, requesting pairing");
        self.adapter.create_bond(address).await?;

        let polls = self.settings.pairing_polls;
        for poll in 1..=polls {
            tokio::time::sleep(self.settings.pairing_poll_interval).await;
            if self.adapter.bond_state(address).await? == BondState::Bonded {
                info!(poll, "pairing complete");
                return Ok(());
            }
        }
        Err(BondruckerError::PairingFailed {
            address: address.to_string(),
            polls,
        })
    }

    /// Close whatever link is currently held before a new one is opened.
    async fn release_active(&self) {
        let previous = self.lock_active().take();
        if let Some(link) = previous {
            debug!(previous = %link.address, "releasing previous link");
            if let Err(e) = link.connection.close().await {
                warn!(previous = %link.address, error = %e, "error while closing previous link");
            }
            if self.statuses.get(&link.address) == PrinterStatus::Connected {
                self.statuses.set(&link.address, PrinterStatus::Disconnected);
            }
        }
    }

    async fn open_first_candidate(&self, address: &str) -> Result<Arc<dyn PrinterConnection>> {
        let schedule = RetryConfig::linear(
            self.settings.attempts_per_candidate,
            self.settings.connect_base_delay,
        );

        for candidate in &PROTOCOL_CANDIDATES {
            let mut attempt = 1;
            loop {
                match self.adapter.open_connection(address, candidate).await {
                    Ok(connection) => {
                        info!(protocol = candidate.label, attempt, "socket open");
                        return Ok(connection);
                    }
                    Err(e) => {
                        debug!(protocol = candidate.label, attempt, error = %e, "connect attempt failed");
                        match should_retry(&e, attempt, &schedule) {
                            RetryDecision::RetryAfter(delay) => tokio::time::sleep(delay).await,
                            RetryDecision::Exhausted => break,
                            RetryDecision::GiveUp(class) => {
                                debug!(protocol = candidate.label, ?class, "skipping protocol candidate");
                                break;
                            }
                        }
                    }
                }
                attempt += 1;
            }
            warn!(protocol = candidate.label, "protocol candidate exhausted");
        }

        Err(BondruckerError::ConnectionFailed {
            address: address.to_string(),
            candidates: PROTOCOL_CANDIDATES.len(),
        })
    }

    async fn notify_sink(&self, connected: bool) {
        if let Some(sink) = &self.settings_sink {
            sink.set_printer_connection(connected).await;
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveLink>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
