// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt printer manager: one radio, one link, one queue.
//
// Printing always goes connect → render → sanitize → send. A failed send
// tears the link down so the next print reconnects from scratch.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bondrucker_bridge::BluetoothAdapter;
use bondrucker_core::config::ManagerConfig;
use bondrucker_core::error::{BondruckerError, Result};
use bondrucker_core::repository::{OrderRepository, PrinterSettingsSink};
use bondrucker_core::types::{DiscoveredDevice, Order, PrintJob, PrinterConfig, PrinterStatus};
use bondrucker_layout::{ContentSanitizer, OrderTemplate};
use tracing::{debug, error, info, instrument, warn};

use crate::connection::{ConnectionManager, StatusBoard};
use crate::diagnostics::DiagnosticProbe;
use crate::discovery::DeviceScanner;
use crate::queue::{JobPrinter, PrintJobQueue};

/// Manager for the store's receipt printer.
pub struct ReceiptPrinter {
    config: ManagerConfig,
    connections: ConnectionManager,
    scanner: DeviceScanner,
    template: OrderTemplate,
    sanitizer: ContentSanitizer,
    orders: Arc<dyn OrderRepository>,
    probe: DiagnosticProbe,
    queue: PrintJobQueue,
}

impl ReceiptPrinter {
    pub fn new(
        adapter: Arc<dyn BluetoothAdapter>,
        orders: Arc<dyn OrderRepository>,
        settings_sink: Option<Arc<dyn PrinterSettingsSink>>,
        config: ManagerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let statuses = Arc::new(StatusBoard::new());
            let mut connections = ConnectionManager::new(
                Arc::clone(&adapter),
                config.connection.clone(),
                Arc::clone(&statuses),
            );
            if let Some(sink) = settings_sink {
                connections = connections.with_settings_sink(sink);
            }
            let scanner = DeviceScanner::new(adapter, statuses, config.scan.clone());
            let job_printer: Weak<dyn JobPrinter> = this.clone();
            let queue = PrintJobQueue::new(job_printer, Arc::clone(&orders), config.queue.clone());

            Self {
                template: OrderTemplate::new(config.store.clone()),
                sanitizer: ContentSanitizer::new(),
                probe: DiagnosticProbe::new(config.probe.clone()),
                connections,
                scanner,
                orders,
                queue,
                config,
            }
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn scanner(&self) -> &DeviceScanner {
        &self.scanner
    }

    pub fn queue(&self) -> &PrintJobQueue {
        &self.queue
    }

    pub async fn scan_printers(&self) -> Vec<DiscoveredDevice> {
        self.scanner.scan_printers().await
    }

    pub async fn connect(&self, printer: &PrinterConfig) -> bool {
        self.connections.connect(printer).await
    }

    pub async fn disconnect(&self, printer: &PrinterConfig) {
        self.connections.disconnect(printer).await
    }

    pub fn status(&self, address: &str) -> PrinterStatus {
        self.connections.status(address)
    }

    /// Print one receipt for `order`, reconnecting first if needed. Marks
    /// the order printed on success.
    #[instrument(skip_all, fields(order_id = order.id, address = %printer.address))]
    pub async fn print_order(&self, order: &Order, printer: &PrinterConfig) -> bool {
        let markup = self.template.render_order(order, printer);
        if !self.print_markup(printer, &markup).await {
            return false;
        }
        if let Err(e) = self.orders.mark_order_as_printed(order.id).await {
            warn!(error = %e, "receipt printed but the order could not be marked");
        }
        info!("order printed");
        true
    }

    /// Print the test page on `printer`.
    #[instrument(skip_all, fields(address = %printer.address))]
    pub async fn print_test(&self, printer: &PrinterConfig) -> bool {
        let markup = self.template.render_test_page(printer);
        let printed = self.print_markup(printer, &markup).await;
        if printed {
            info!("test page printed");
        }
        printed
    }

    /// Queue a newly arrived order on the default printer when auto-print
    /// is switched on. Returns whether a job was queued.
    #[instrument(skip_all, fields(order_id = order.id))]
    pub fn auto_print_new_order(&self, order: Order) -> bool {
        if !self.config.auto_print_enabled {
            debug!("auto-print disabled");
            return false;
        }
        let Some(printer) = self
            .config
            .default_printer
            .as_ref()
            .filter(|printer| printer.is_auto_print)
        else {
            debug!("no default printer with auto-print");
            return false;
        };
        if order.is_printed {
            debug!("order already printed, skipping");
            return false;
        }

        let copies = printer.print_copies;
        self.queue.enqueue(PrintJob::for_order(order, printer.clone(), copies));
        true
    }

    /// Queue an explicit job.
    pub fn enqueue(&self, job: PrintJob) {
        self.queue.enqueue(job);
    }

    /// Diagnostics against the link currently held for `printer`.
    pub async fn run_diagnostics(&self, printer: &PrinterConfig) -> String {
        let connection = self.connections.connection_for(&printer.address);
        let connected = self.connections.status(&printer.address) == PrinterStatus::Connected;
        self.probe
            .run_full_diagnostics(printer, connection, connected)
            .await
    }

    // -- internal helpers ---------------------------------------------------

    async fn print_markup(&self, printer: &PrinterConfig, markup: &str) -> bool {
        if !self.connections.connect(printer).await {
            warn!("printer not reachable, nothing sent");
            return false;
        }

        let content = self.sanitizer.sanitize(markup);
        match self.send(printer, &content).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "print failed, dropping the link");
                self.connections.disconnect(printer).await;
                false
            }
        }
    }

    async fn send(&self, printer: &PrinterConfig, content: &str) -> Result<()> {
        let connection = self
            .connections
            .connection_for(&printer.address)
            .ok_or_else(|| BondruckerError::NotConnected(printer.address.clone()))?;
        connection.print_formatted(content, printer.paper_width).await
    }
}

#[async_trait]
impl JobPrinter for ReceiptPrinter {
    async fn print(&self, order: &Order, printer: &PrinterConfig) -> bool {
        self.print_order(order, printer).await
    }
}
