// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary traits for the collaborators the printer manager talks to: the
// order store and the settings sink that tracks connection state.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Order, OrderId};

/// Read/update access to orders held by the commerce client.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fetch one order. `Ok(None)` when the id is unknown.
    async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Record that a receipt for this order has been printed.
    async fn mark_order_as_printed(&self, id: OrderId) -> Result<()>;
}

/// Receives printer connection state for persistence/UI.
#[async_trait]
pub trait PrinterSettingsSink: Send + Sync {
    async fn set_printer_connection(&self, connected: bool);
}

/// Repository that knows no orders. Jobs must carry their order inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOrders;

#[async_trait]
impl OrderRepository for NoOrders {
    async fn get_order_by_id(&self, _id: OrderId) -> Result<Option<Order>> {
        Ok(None)
    }

    async fn mark_order_as_printed(&self, _id: OrderId) -> Result<()> {
        Ok(())
    }
}
