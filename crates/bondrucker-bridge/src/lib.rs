// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondrucker: Platform Bluetooth bridge abstractions.
//
// The printer manager only ever talks to the radio through the traits in
// `traits`. Mobile hosts inject their own adapter; desktop and CI builds get
// the stub, which reports Bluetooth as unavailable.

pub mod stub;
pub mod traits;

pub use traits::{
    BluetoothAdapter, BluetoothDevice, BondState, DiscoveryEvent, PROTOCOL_CANDIDATES,
    PrinterConnection, ProtocolCandidate, RawChannel,
};

/// The adapter for the current host.
pub fn platform_bridge() -> Box<dyn BluetoothAdapter> {
    Box::new(stub::StubBridge)
}
