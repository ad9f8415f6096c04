// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondrucker Print: Bluetooth connection state machine, device scanning,
// serialised job queue, and link diagnostics. This crate drives the radio
// through the `bondrucker-bridge` traits and renders receipts with
// `bondrucker-layout`.

pub mod connection;
pub mod diagnostics;
pub mod discovery;
pub mod printer;
pub mod queue;
pub mod retry;

#[cfg(test)]
mod testing;

pub use connection::{ConnectionManager, StatusBoard, StatusChange};
pub use diagnostics::{DiagnosticProbe, DiagnosticReport};
pub use discovery::DeviceScanner;
pub use printer::ReceiptPrinter;
pub use queue::{JobEvent, JobPrinter, PrintJobQueue};
