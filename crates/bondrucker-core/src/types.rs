// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bondrucker receipt printer manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an order in the upstream commerce system.
pub type OrderId = u64;

/// Unique identifier for a queued print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the printer is attached to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrinterType {
    /// Classic Bluetooth serial profile. The only transport implemented here.
    Bluetooth,
    Network,
    Usb,
}

/// Thermal paper roll width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaperWidth {
    /// 57/58 mm roll.
    Mm57,
    /// 80 mm roll (about 72 mm printable).
    Mm80,
}

impl PaperWidth {
    /// Fixed-width character cells per printed line.
    pub fn columns(&self) -> usize {
        match self {
            Self::Mm57 => 32,
            Self::Mm80 => 42,
        }
    }

    /// Roll width in millimetres.
    pub fn millimetres(&self) -> u32 {
        match self {
            Self::Mm57 => 57,
            Self::Mm80 => 80,
        }
    }

    /// Map a millimetre value to a paper width. 58 is accepted as the
    /// common alias of the narrow roll.
    pub fn from_millimetres(mm: u32) -> Option<Self> {
        match mm {
            57 | 58 => Some(Self::Mm57),
            80 => Some(Self::Mm80),
            _ => None,
        }
    }
}

impl Default for PaperWidth {
    fn default() -> Self {
        Self::Mm57
    }
}

/// Configuration of one physical printer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub name: String,
    /// Unique device id (Bluetooth MAC address).
    pub address: String,
    #[serde(rename = "type")]
    pub printer_type: PrinterType,
    pub paper_width: PaperWidth,
    pub print_copies: u32,
    pub is_auto_print: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub print_store_info: bool,
    #[serde(default = "default_true")]
    pub print_customer_info: bool,
    #[serde(default = "default_true")]
    pub print_item_details: bool,
    #[serde(default = "default_true")]
    pub print_order_notes: bool,
    #[serde(default = "default_true")]
    pub print_footer: bool,
}

fn default_true() -> bool {
    true
}

impl PrinterConfig {
    /// A Bluetooth printer with default template toggles, one copy, and
    /// auto-print disabled.
    pub fn bluetooth(name: impl Into<String>, address: impl Into<String>, paper_width: PaperWidth) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            printer_type: PrinterType::Bluetooth,
            paper_width,
            print_copies: 1,
            is_auto_print: false,
            is_default: false,
            print_store_info: true,
            print_customer_info: true,
            print_item_details: true,
            print_order_notes: true,
            print_footer: true,
        }
    }

    /// Name shown in logs and reports, falling back to the address.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}

/// Connection state of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrinterStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl Default for PrinterStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

/// A printer candidate found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub printer_type: PrinterType,
    pub status: PrinterStatus,
    /// Whether the host already has a bond with this device.
    pub paired: bool,
}

/// A request to print one order on one printer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub order_id: OrderId,
    pub printer: PrinterConfig,
    pub copies: u32,
    /// Number of times this job has been put back on the queue.
    pub retry_count: u32,
    /// Inline snapshot; when absent the worker resolves the order by id.
    pub order: Option<Order>,
    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(order_id: OrderId, printer: PrinterConfig, copies: u32) -> Self {
        Self {
            id: JobId::new(),
            order_id,
            printer,
            copies: copies.max(1),
            retry_count: 0,
            order: None,
            created_at: Utc::now(),
        }
    }

    /// Build a job that carries its order inline.
    pub fn for_order(order: Order, printer: PrinterConfig, copies: u32) -> Self {
        let mut job = Self::new(order.id, printer, copies);
        job.order = Some(order);
        job
    }

    /// Copy of this job for re-enqueueing after a failed round.
    pub fn retried(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Radio glitch, busy device, dropped link: worth another try.
    Transient,
    /// User must act (pair the device, switch Bluetooth on).
    UserAction,
    /// Retrying cannot help.
    Permanent,
}

/// Store details printed in the receipt header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub currency_symbol: String,
}

impl Default for StoreInfo {
    fn default() -> Self {
        Self {
            name: "My Store".into(),
            address: String::new(),
            phone: String::new(),
            currency_symbol: "$".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Order payload
// ---------------------------------------------------------------------------

/// Flattened order as handed over by the commerce client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub number: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub billing_address: String,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub fee_lines: Vec<FeeLine>,
    #[serde(default)]
    pub tax_lines: Vec<TaxLine>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub total_tax: f64,
    #[serde(default)]
    pub discount_total: f64,
    pub total: f64,
    #[serde(default)]
    pub fulfillment: Option<Fulfillment>,
    #[serde(default)]
    pub is_printed: bool,
}

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_total: f64,
    #[serde(default)]
    pub options: Vec<ItemOption>,
}

/// Variation/add-on attached to an item, e.g. `Size: Large`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOption {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLine {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    pub label: String,
    pub rate_percent: f64,
    pub total: f64,
}

/// How the customer receives the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentMethod {
    Delivery,
    Pickup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub method: FulfillmentMethod,
    /// Requested date, free-form as entered at checkout.
    pub date: Option<String>,
    pub time: Option<String>,
}
