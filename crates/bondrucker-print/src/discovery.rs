// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bluetooth printer discovery.
//
// A scan is seeded with the devices the host already trusts, then live
// discovery fills in the rest. Events from the radio arrive on an mpsc
// channel that a background task drains into the shared device list;
// observers follow the list through a `watch` receiver. A second task ends
// discovery after the configured timeout.
//
// Nothing here fails outward: a radio that is off, a bonded-device query
// that errors, or discovery that refuses to start all degrade to whatever
// subset could be read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bondrucker_bridge::{BluetoothAdapter, BluetoothDevice, BondState, DiscoveryEvent};
use bondrucker_core::config::ScanSettings;
use bondrucker_core::error::BondruckerError;
use bondrucker_core::types::{DiscoveredDevice, PrinterType};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::connection::StatusBoard;

/// Printer discovery engine over a [`BluetoothAdapter`].
pub struct DeviceScanner {
    adapter: Arc<dyn BluetoothAdapter>,
    statuses: Arc<StatusBoard>,
    settings: ScanSettings,
    devices: Arc<watch::Sender<Vec<DiscoveredDevice>>>,
    scanning: Arc<AtomicBool>,
    /// Event drain and timeout tasks of the current scan.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DeviceScanner {
    pub fn new(
        adapter: Arc<dyn BluetoothAdapter>,
        statuses: Arc<StatusBoard>,
        settings: ScanSettings,
    ) -> Self {
        let (devices, _) = watch::channel(Vec::new());
        Self {
            adapter,
            statuses,
            settings,
            devices: Arc::new(devices),
            scanning: Arc::new(AtomicBool::new(false)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start a fresh scan and return the devices known right away (the
    /// paired ones). Live results keep arriving on [`devices`](Self::devices).
    #[instrument(skip(self))]
    pub async fn scan_printers(&self) -> Vec<DiscoveredDevice> {
        self.abort_tasks();
        self.devices.send_replace(Vec::new());

        if !self.adapter.is_enabled().await {
            let err = BondruckerError::BluetoothUnavailable;
            warn!(platform = self.adapter.platform_name(), error = %err, "nothing to scan");
            return Vec::new();
        }

        match self.adapter.bonded_devices().await {
            Ok(bonded) => {
                debug!(count = bonded.len(), "seeding scan with bonded devices");
                for device in &bonded {
                    merge_device(&self.devices, &self.statuses, device);
                }
            }
            Err(e) => warn!(error = %e, "could not read bonded devices"),
        }

        if self.adapter.is_discovering().await {
            debug!("discovery already running, restarting it");
            if let Err(e) = self.adapter.cancel_discovery().await {
                warn!(error = %e, "could not cancel running discovery");
            }
            tokio::time::sleep(self.settings.restart_pause).await;
        }

        match self.adapter.start_discovery().await {
            Ok(events) => {
                self.scanning.store(true, Ordering::SeqCst);
                let drain = tokio::spawn(drain_events(
                    events,
                    Arc::clone(&self.devices),
                    Arc::clone(&self.statuses),
                    Arc::clone(&self.scanning),
                ));
                let timeout = tokio::spawn(cancel_after_timeout(
                    Arc::clone(&self.adapter),
                    Arc::clone(&self.scanning),
                    self.settings.clone(),
                ));
                self.lock_tasks().extend([drain, timeout]);
                info!(timeout_s = self.settings.timeout.as_secs(), "live discovery started");
            }
            Err(e) => warn!(error = %e, "live discovery unavailable, showing paired printers only"),
        }

        self.devices.borrow().clone()
    }

    /// Stop a running scan. Safe to call when nothing is running.
    #[instrument(skip(self))]
    pub async fn stop_discovery(&self) {
        self.abort_tasks();
        if let Err(e) = self.adapter.cancel_discovery().await {
            warn!(error = %e, "could not cancel discovery");
        }
        if self.scanning.swap(false, Ordering::SeqCst) {
            info!("discovery stopped");
        }
    }

    /// Observer of the device list; every merge publishes a new snapshot.
    pub fn devices(&self) -> watch::Receiver<Vec<DiscoveredDevice>> {
        self.devices.subscribe()
    }

    /// Snapshot of the current device list.
    pub fn snapshot(&self) -> Vec<DiscoveredDevice> {
        self.devices.borrow().clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    // -- internal helpers ---------------------------------------------------

    fn abort_tasks(&self) {
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DeviceScanner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Merge radio events into the list until discovery finishes or the sender
/// goes away.
async fn drain_events(
    mut events: mpsc::Receiver<DiscoveryEvent>,
    devices: Arc<watch::Sender<Vec<DiscoveredDevice>>>,
    statuses: Arc<StatusBoard>,
    scanning: Arc<AtomicBool>,
) {
    while let Some(event) = events.recv().await {
        match event {
            DiscoveryEvent::DeviceFound(device) => {
                debug!(address = %device.address, name = ?device.name, "device found");
                merge_device(&devices, &statuses, &device);
            }
            DiscoveryEvent::BondStateChanged { address, state } => {
                debug!(%address, ?state, "bond state changed");
                devices.send_if_modified(|list| {
                    let Some(entry) = list.iter_mut().find(|d| d.address == address) else {
                        return false;
                    };
                    entry.paired = state == BondState::Bonded;
                    sort_devices(list);
                    true
                });
            }
            DiscoveryEvent::DiscoveryFinished => break,
        }
    }
    scanning.store(false, Ordering::SeqCst);
    info!(found = devices.borrow().len(), "discovery finished");
}

async fn cancel_after_timeout(
    adapter: Arc<dyn BluetoothAdapter>,
    scanning: Arc<AtomicBool>,
    settings: ScanSettings,
) {
    tokio::time::sleep(settings.timeout).await;
    if scanning.swap(false, Ordering::SeqCst) {
        info!("scan timed out, cancelling discovery");
        if let Err(e) = adapter.cancel_discovery().await {
            warn!(error = %e, "could not cancel discovery after timeout");
        }
    }
}

/// Insert or refresh one device and republish the sorted list.
fn merge_device(
    devices: &watch::Sender<Vec<DiscoveredDevice>>,
    statuses: &StatusBoard,
    device: &BluetoothDevice,
) {
    let status = statuses.get(&device.address);
    devices.send_modify(|list| {
        match list.iter_mut().find(|d| d.address == device.address) {
            Some(existing) => {
                existing.paired |= device.bonded;
                if device.name.is_some() {
                    existing.name = display_name(device);
                }
                existing.status = status;
            }
            None => list.push(DiscoveredDevice {
                name: display_name(device),
                address: device.address.clone(),
                printer_type: PrinterType::Bluetooth,
                status,
                paired: device.bonded,
            }),
        }
        sort_devices(list);
    });
}

/// Advertised name, or a placeholder built from the address tail.
fn display_name(device: &BluetoothDevice) -> String {
    match device.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let tail_start = device
                .address
                .char_indices()
                .rev()
                .nth(4)
                .map_or(0, |(idx, _)| idx);
            format!("Unknown device ({})", &device.address[tail_start..])
        }
    }
}

/// Paired devices first, then by name.
fn sort_devices(list: &mut [DiscoveredDevice]) {
    list.sort_by(|a, b| b.paired.cmp(&a.paired).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bondrucker_core::types::PrinterStatus;

    use super::*;
    use crate::testing::{FakeAdapter, device};

    fn scanner(adapter: FakeAdapter) -> (Arc<FakeAdapter>, DeviceScanner) {
        let adapter = Arc::new(adapter);
        let scanner = DeviceScanner::new(
            Arc::clone(&adapter) as Arc<dyn BluetoothAdapter>,
            Arc::new(StatusBoard::new()),
            ScanSettings::default(),
        );
        (adapter, scanner)
    }

    fn two_paired() -> FakeAdapter {
        FakeAdapter {
            enabled: true,
            bonded: vec![
                device(Some("Kitchen"), "AA:AA:AA:AA:AA:01", true),
                device(Some("Bar"), "AA:AA:AA:AA:AA:02", true),
            ],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_discovery_keeps_paired_devices() {
        let (_, scanner) = scanner(two_paired());

        let found = scanner.scan_printers().await;
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| d.paired));
        assert!(!scanner.is_scanning());
        assert_eq!(scanner.snapshot(), found);
    }

    #[tokio::test(start_paused = true)]
    async fn radio_off_yields_empty_list() {
        let mut adapter = two_paired();
        adapter.enabled = false;
        let (_, scanner) = scanner(adapter);

        assert!(scanner.scan_printers().await.is_empty());
        assert!(scanner.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn live_results_merge_into_the_list() {
        let adapter = two_paired();
        *adapter.discovery.lock().expect("lock") = Some(vec![
            DiscoveryEvent::DeviceFound(device(None, "BB:BB:BB:BB:12:34", false)),
            DiscoveryEvent::DeviceFound(device(Some("Aardvark"), "BB:BB:BB:BB:BB:BB", false)),
            // Duplicate report of a paired device must not add a row.
            DiscoveryEvent::DeviceFound(device(Some("Kitchen"), "AA:AA:AA:AA:AA:01", false)),
            DiscoveryEvent::DiscoveryFinished,
        ]);
        let (_, scanner) = scanner(adapter);
        let mut rx = scanner.devices();

        let immediate = scanner.scan_printers().await;
        assert_eq!(immediate.len(), 2);

        while rx.borrow_and_update().len() < 4 {
            rx.changed().await.expect("scanner alive");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let names: Vec<String> = scanner.snapshot().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Bar", "Kitchen", "Aardvark", "Unknown device (12:34)"]);
        assert!(!scanner.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn bond_change_moves_device_to_paired() {
        let adapter = two_paired();
        *adapter.discovery.lock().expect("lock") = Some(vec![
            DiscoveryEvent::DeviceFound(device(Some("Aardvark"), "CC:CC:CC:CC:CC:CC", false)),
            DiscoveryEvent::BondStateChanged {
                address: "CC:CC:CC:CC:CC:CC".into(),
                state: BondState::Bonded,
            },
            DiscoveryEvent::DiscoveryFinished,
        ]);
        let (_, scanner) = scanner(adapter);

        scanner.scan_printers().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let list = scanner.snapshot();
        assert_eq!(list[0].name, "Aardvark");
        assert!(list[0].paired);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_times_out_and_cancels_discovery() {
        let adapter = two_paired();
        // No DiscoveryFinished: the radio keeps going until cancelled.
        *adapter.discovery.lock().expect("lock") = Some(Vec::new());
        let (adapter, scanner) = scanner(adapter);

        scanner.scan_printers().await;
        assert!(scanner.is_scanning());
        assert_eq!(adapter.cancels.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!scanner.is_scanning());
        assert_eq!(adapter.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discovery_is_idempotent() {
        let (adapter, scanner) = scanner(two_paired());
        scanner.stop_discovery().await;
        scanner.stop_discovery().await;
        assert!(!scanner.is_scanning());
        assert_eq!(adapter.cancels.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn list_reflects_connection_status() {
        let adapter = Arc::new(two_paired());
        let statuses = Arc::new(StatusBoard::new());
        statuses.set("AA:AA:AA:AA:AA:01", PrinterStatus::Connected);
        let scanner = DeviceScanner::new(adapter, statuses, ScanSettings::default());

        let found = scanner.scan_printers().await;
        let kitchen = found.iter().find(|d| d.name == "Kitchen").expect("kitchen");
        assert_eq!(kitchen.status, PrinterStatus::Connected);
    }

    #[test]
    fn unnamed_device_uses_address_tail() {
        assert_eq!(
            display_name(&device(Some("  "), "00:11:22:33:AB:CD", false)),
            "Unknown device (AB:CD)"
        );
        assert_eq!(display_name(&device(None, "AB", false)), "Unknown device (AB)");
    }
}
