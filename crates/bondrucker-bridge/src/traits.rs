// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the Bluetooth radio, an open
// printer link, and the optional raw byte channel used for diagnostics.

use std::sync::Arc;

use async_trait::async_trait;
use bondrucker_core::error::Result;
use bondrucker_core::types::PaperWidth;
use tokio::sync::mpsc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Protocol candidates
// ---------------------------------------------------------------------------

/// A serial-profile service identifier to try when opening a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolCandidate {
    pub uuid: Uuid,
    pub label: &'static str,
}

/// Service identifiers in the order they are tried. Cheap printers do not
/// agree on which one they advertise.
pub const PROTOCOL_CANDIDATES: [ProtocolCandidate; 4] = [
    ProtocolCandidate {
        uuid: Uuid::from_u128(0x00001101_0000_1000_8000_00805f9b34fb),
        label: "SPP",
    },
    ProtocolCandidate {
        uuid: Uuid::from_u128(0x49535343_fe7d_4ae5_8fa9_9fafd205e455),
        label: "ISSC transparent UART",
    },
    ProtocolCandidate {
        uuid: Uuid::from_u128(0x8ce255c0_200a_11e0_ac64_0800200c9a66),
        label: "vendor serial",
    },
    ProtocolCandidate {
        uuid: Uuid::from_u128(0x00000000_0000_1000_8000_00805f9b34fb),
        label: "base",
    },
];

// ---------------------------------------------------------------------------
// Radio
// ---------------------------------------------------------------------------

/// A remote device as reported by the host stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothDevice {
    /// Advertised name, if the device sent one.
    pub name: Option<String>,
    pub address: String,
    pub bonded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondState {
    None,
    Bonding,
    Bonded,
}

/// Events produced by a running discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    DeviceFound(BluetoothDevice),
    BondStateChanged { address: String, state: BondState },
    /// The stack ended discovery on its own. The sender is dropped after this.
    DiscoveryFinished,
}

/// Host Bluetooth adapter.
#[async_trait]
pub trait BluetoothAdapter: Send + Sync {
    /// Human-readable platform name (e.g. "Android 14").
    fn platform_name(&self) -> &str;

    /// Whether the radio exists and is switched on.
    async fn is_enabled(&self) -> bool;

    /// Devices the host already trusts.
    async fn bonded_devices(&self) -> Result<Vec<BluetoothDevice>>;

    /// Resolve a device handle by address. `Ok(None)` when the address is
    /// not valid for this stack.
    async fn remote_device(&self, address: &str) -> Result<Option<BluetoothDevice>>;

    /// Ask the host to start bonding. Completion is observed via `bond_state`.
    async fn create_bond(&self, address: &str) -> Result<()>;

    async fn bond_state(&self, address: &str) -> Result<BondState>;

    /// Start live discovery. Events arrive on the returned channel until
    /// discovery finishes or is cancelled.
    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveryEvent>>;

    async fn cancel_discovery(&self) -> Result<()>;

    async fn is_discovering(&self) -> bool;

    /// Open a socket to `address` for one service identifier.
    async fn open_connection(
        &self,
        address: &str,
        candidate: &ProtocolCandidate,
    ) -> Result<Arc<dyn PrinterConnection>>;
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// An open link to one printer, wrapped around the external markup codec.
#[async_trait]
pub trait PrinterConnection: Send + Sync {
    fn address(&self) -> &str;

    async fn is_connected(&self) -> bool;

    /// Encode the `[L]/[C]/[R]` markup stream for `paper` and send it.
    async fn print_formatted(&self, markup: &str, paper: PaperWidth) -> Result<()>;

    /// Send raw bytes, bypassing the markup codec.
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Best-effort access to the underlying bidirectional byte stream.
    /// Most implementations cannot offer one.
    fn raw_channel(&self) -> Option<Arc<dyn RawChannel>> {
        None
    }
}

/// Raw bidirectional byte stream under a printer link.
#[async_trait]
pub trait RawChannel: Send + Sync {
    /// Discard unread input. Returns the number of bytes dropped.
    async fn clear_input(&self) -> Result<usize>;

    async fn send(&self, bytes: &[u8]) -> Result<()>;

    /// Non-blocking read. `Ok(0)` when nothing is pending.
    async fn try_read(&self, buf: &mut [u8]) -> Result<usize>;
}
