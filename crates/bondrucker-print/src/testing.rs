// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory radio, link and raw channel used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bondrucker_bridge::{
    BluetoothAdapter, BluetoothDevice, BondState, DiscoveryEvent, PrinterConnection,
    ProtocolCandidate, RawChannel,
};
use bondrucker_core::error::{BondruckerError, Result};
use bondrucker_core::types::PaperWidth;
use tokio::sync::mpsc;

pub const PRINTER: &str = "66:55:44:33:22:11";

pub fn device(name: Option<&str>, address: &str, bonded: bool) -> BluetoothDevice {
    BluetoothDevice {
        name: name.map(String::from),
        address: address.into(),
        bonded,
    }
}

#[derive(Default)]
pub struct FakeAdapter {
    pub enabled: bool,
    pub bonded: Vec<BluetoothDevice>,
    /// Devices `remote_device` can resolve.
    pub known: Vec<BluetoothDevice>,
    /// Discovery script; `None` makes `start_discovery` fail.
    pub discovery: Mutex<Option<Vec<DiscoveryEvent>>>,
    /// Failed `open_connection` calls before one succeeds.
    pub failing_opens: AtomicU32,
    pub opens: AtomicU32,
    pub bond_requests: AtomicU32,
    /// Bond-state polls answered `Bonding` before `Bonded`; `None` never bonds.
    pub bond_after: Option<u32>,
    pub bond_polls: AtomicU32,
    pub discovering: AtomicBool,
    pub live: Mutex<Option<mpsc::Sender<DiscoveryEvent>>>,
    pub cancels: AtomicU32,
    pub links: Mutex<Vec<Arc<FakeConnection>>>,
    /// Protocol labels the printer rejects as unsupported.
    pub unsupported_protocols: Vec<&'static str>,
    /// Protocol label of every `open_connection` call, in order.
    pub attempted: Mutex<Vec<&'static str>>,
    /// Raw channel handed to every new link.
    pub raw: Option<Arc<FakeRawChannel>>,
}

impl FakeAdapter {
    /// Switched-on radio that knows one bonded printer at [`PRINTER`].
    pub fn with_printer() -> Self {
        let printer = device(Some("Receipt58"), PRINTER, true);
        Self {
            enabled: true,
            bonded: vec![printer.clone()],
            known: vec![printer],
            ..Default::default()
        }
    }

    pub fn attempted_protocols(&self) -> Vec<&'static str> {
        self.attempted.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn last_link(&self) -> Option<Arc<FakeConnection>> {
        self.links.lock().ok()?.last().cloned()
    }
}

#[async_trait]
impl BluetoothAdapter for FakeAdapter {
    fn platform_name(&self) -> &str {
        "Fake radio"
    }

    async fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn bonded_devices(&self) -> Result<Vec<BluetoothDevice>> {
        Ok(self.bonded.clone())
    }

    async fn remote_device(&self, address: &str) -> Result<Option<BluetoothDevice>> {
        Ok(self.known.iter().find(|d| d.address == address).cloned())
    }

    async fn create_bond(&self, _address: &str) -> Result<()> {
        self.bond_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn bond_state(&self, _address: &str) -> Result<BondState> {
        let poll = self.bond_polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(match self.bond_after {
            Some(after) if poll > after => BondState::Bonded,
            _ => BondState::Bonding,
        })
    }

    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        let script = self
            .discovery
            .lock()
            .map_err(|_| BondruckerError::Transport("poisoned".into()))?
            .take()
            .ok_or_else(|| BondruckerError::Transport("discovery refused".into()))?;
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for event in script {
            tx.try_send(event)
                .map_err(|e| BondruckerError::Transport(e.to_string()))?;
        }
        self.discovering.store(true, Ordering::SeqCst);
        // The radio keeps the stream open until discovery is cancelled.
        if let Ok(mut live) = self.live.lock() {
            *live = Some(tx);
        }
        Ok(rx)
    }

    async fn cancel_discovery(&self) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut live) = self.live.lock() {
            live.take();
        }
        self.discovering.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_discovering(&self) -> bool {
        self.discovering.load(Ordering::SeqCst)
    }

    async fn open_connection(
        &self,
        address: &str,
        candidate: &ProtocolCandidate,
    ) -> Result<Arc<dyn PrinterConnection>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut attempted) = self.attempted.lock() {
            attempted.push(candidate.label);
        }
        if self.unsupported_protocols.contains(&candidate.label) {
            return Err(BondruckerError::Transport(
                "service discovery failed: not supported".into(),
            ));
        }
        let remaining = self.failing_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(BondruckerError::Transport("connection refused".into()));
        }
        let link = Arc::new(FakeConnection::new(address, self.raw.clone()));
        if let Ok(mut links) = self.links.lock() {
            links.push(Arc::clone(&link));
        }
        Ok(link)
    }
}

pub struct FakeConnection {
    address: String,
    pub connected: AtomicBool,
    pub printed: Mutex<Vec<String>>,
    pub written: Mutex<Vec<Vec<u8>>>,
    /// Prints that fail before one succeeds.
    pub failing_prints: AtomicU32,
    raw: Option<Arc<FakeRawChannel>>,
}

impl FakeConnection {
    pub fn new(address: &str, raw: Option<Arc<FakeRawChannel>>) -> Self {
        Self {
            address: address.into(),
            connected: AtomicBool::new(true),
            printed: Mutex::new(Vec::new()),
            written: Mutex::new(Vec::new()),
            failing_prints: AtomicU32::new(0),
            raw,
        }
    }

    pub fn printed(&self) -> Vec<String> {
        self.printed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PrinterConnection for FakeConnection {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn print_formatted(&self, markup: &str, _paper: PaperWidth) -> Result<()> {
        let remaining = self.failing_prints.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_prints.store(remaining - 1, Ordering::SeqCst);
            return Err(BondruckerError::Transport("broken pipe".into()));
        }
        if let Ok(mut printed) = self.printed.lock() {
            printed.push(markup.to_string());
        }
        Ok(())
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Ok(mut written) = self.written.lock() {
            written.push(bytes.to_vec());
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn raw_channel(&self) -> Option<Arc<dyn RawChannel>> {
        self.raw.clone().map(|raw| raw as Arc<dyn RawChannel>)
    }
}

/// Answers each status request from a table keyed by the request bytes.
#[derive(Default)]
pub struct FakeRawChannel {
    pub replies: HashMap<Vec<u8>, Vec<u8>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
    pending: Mutex<VecDeque<u8>>,
}

impl FakeRawChannel {
    pub fn answering(replies: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl RawChannel for FakeRawChannel {
    async fn clear_input(&self) -> Result<usize> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| BondruckerError::Transport("poisoned".into()))?;
        let dropped = pending.len();
        pending.clear();
        Ok(dropped)
    }

    async fn send(&self, bytes: &[u8]) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(bytes.to_vec());
        }
        if let Some(reply) = self.replies.get(bytes) {
            if let Ok(mut pending) = self.pending.lock() {
                pending.extend(reply.iter().copied());
            }
        }
        Ok(())
    }

    async fn try_read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| BondruckerError::Transport("poisoned".into()))?;
        let mut n = 0;
        while n < buf.len() {
            match pending.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}
