// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where no Bluetooth stack is wired in.
//
// The radio reports itself as off. Queries that have a sensible empty answer
// return it; everything else returns `PlatformUnavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use bondrucker_core::error::{BondruckerError, Result};
use tokio::sync::mpsc;

use crate::traits::*;

/// No-op adapter returned on hosts without a native bridge.
pub struct StubBridge;

#[async_trait]
impl BluetoothAdapter for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    async fn is_enabled(&self) -> bool {
        false
    }

    async fn bonded_devices(&self) -> Result<Vec<BluetoothDevice>> {
        Ok(Vec::new())
    }

    async fn remote_device(&self, _address: &str) -> Result<Option<BluetoothDevice>> {
        tracing::warn!("BluetoothAdapter::remote_device called on stub bridge");
        Err(BondruckerError::PlatformUnavailable)
    }

    async fn create_bond(&self, _address: &str) -> Result<()> {
        Err(BondruckerError::PlatformUnavailable)
    }

    async fn bond_state(&self, _address: &str) -> Result<BondState> {
        Err(BondruckerError::PlatformUnavailable)
    }

    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        tracing::warn!("BluetoothAdapter::start_discovery called on stub bridge");
        Err(BondruckerError::PlatformUnavailable)
    }

    async fn cancel_discovery(&self) -> Result<()> {
        Ok(())
    }

    async fn is_discovering(&self) -> bool {
        false
    }

    async fn open_connection(
        &self,
        _address: &str,
        _candidate: &ProtocolCandidate,
    ) -> Result<Arc<dyn PrinterConnection>> {
        tracing::warn!("BluetoothAdapter::open_connection called on stub bridge");
        Err(BondruckerError::PlatformUnavailable)
    }
}
