// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bondrucker.

use thiserror::Error;

use crate::types::{OrderId, PrinterType};

/// Top-level error type for all Bondrucker operations.
///
/// Public manager operations never return this directly; it is converted to
/// a `bool` or a `PrinterStatus` at the boundary and logged there.
#[derive(Debug, Error)]
pub enum BondruckerError {
    // -- Connection --
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("pairing with {address} failed after {polls} bond-state checks")]
    PairingFailed { address: String, polls: u32 },

    #[error("could not connect to {address}: all {candidates} protocol candidates exhausted")]
    ConnectionFailed { address: String, candidates: usize },

    #[error("printer type {0:?} is not supported by this manager")]
    UnsupportedPrinterType(PrinterType),

    #[error("no active connection to {0}")]
    NotConnected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("Bluetooth is unavailable or switched off")]
    BluetoothUnavailable,

    // -- Content --
    #[error("malformed receipt markup: {0}")]
    Format(String),

    // -- Queue --
    #[error("print job for order {order_id} failed after {rounds} queue rounds")]
    QueueExhausted { order_id: OrderId, rounds: u32 },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order repository error: {0}")]
    Repository(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BondruckerError>;
