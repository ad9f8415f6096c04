// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field diagnostics for a printer link.
//
// Checks run in sequence: link object → link alive → raw channel → status
// queries. With a raw channel the printer is asked for its real-time status
// (DLE EOT 1 and DLE EOT 2) and the replies are decoded; without one only a
// one-way ESC @ reset is sent and the report says so. The probe never fails:
// every problem becomes a line in the report.

use std::sync::Arc;
use std::time::Duration;

use bondrucker_bridge::{PrinterConnection, RawChannel};
use bondrucker_core::config::ProbeSettings;
use bondrucker_core::error::Result;
use bondrucker_core::types::PrinterConfig;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// DLE EOT 1: transmit printer status.
const QUERY_PRINTER_STATUS: [u8; 3] = [0x10, 0x04, 0x01];
/// DLE EOT 2: transmit offline cause.
const QUERY_OFFLINE_STATUS: [u8; 3] = [0x10, 0x04, 0x02];
/// ESC @: initialise printer.
const INITIALIZE: [u8; 2] = [0x1B, 0x40];

/// Result of a single diagnostic step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step name shown to the user.
    pub name: String,
    pub passed: bool,
    /// What was tested and what came back.
    pub detail: String,
}

impl StepResult {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Full diagnostic report.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub printer_name: String,
    pub address: String,
    pub paper_mm: u32,
    pub steps: Vec<StepResult>,
    /// No raw channel: only a one-way test could be run.
    pub degraded: bool,
}

impl DiagnosticReport {
    pub fn all_passed(&self) -> bool {
        self.steps.iter().all(|step| step.passed)
    }

    /// Plain-text report for support.
    pub fn to_text(&self) -> String {
        let now = chrono::Local::now().format("%d %b %Y, %H:%M:%S");
        let mut text = format!("Printer Diagnostics\nDate: {now}\n");
        text.push_str(&format!("Printer: {}\n", self.printer_name));
        text.push_str(&format!("Address: {}\n", self.address));
        text.push_str(&format!("Paper: {}mm\n\n", self.paper_mm));

        for (idx, step) in self.steps.iter().enumerate() {
            let mark = if step.passed { "OK  " } else { "FAIL" };
            text.push_str(&format!("{}. [{mark}] {}: {}\n", idx + 1, step.name, step.detail));
        }
        text.push('\n');

        if self.degraded {
            text.push_str(
                "Mode: degraded (one-way). The link offers no readable channel, so the printer's own status could not be read.\n",
            );
        }
        if self.all_passed() {
            text.push_str("All checks passed.\n");
        } else {
            text.push_str("Some checks failed. See the steps above.\n");
        }
        text
    }
}

/// Runs the diagnostic sequence with the configured read timeouts.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticProbe {
    settings: ProbeSettings,
}

impl DiagnosticProbe {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    /// Run every check and return the text report.
    pub async fn run_full_diagnostics(
        &self,
        config: &PrinterConfig,
        connection: Option<Arc<dyn PrinterConnection>>,
        is_connected: bool,
    ) -> String {
        self.run(config, connection, is_connected).await.to_text()
    }

    #[instrument(skip_all, fields(address = %config.address))]
    pub async fn run(
        &self,
        config: &PrinterConfig,
        connection: Option<Arc<dyn PrinterConnection>>,
        is_connected: bool,
    ) -> DiagnosticReport {
        let mut report = DiagnosticReport {
            printer_name: config.display_name().to_string(),
            address: config.address.clone(),
            paper_mm: config.paper_width.millimetres(),
            steps: Vec::new(),
            degraded: false,
        };

        // Step 1: link object
        let Some(connection) = connection else {
            report.steps.push(StepResult::fail(
                "Connection",
                "No connection is open to this printer. Connect first, then run diagnostics again.",
            ));
            info!("diagnostics stopped: no connection");
            return report;
        };
        report
            .steps
            .push(StepResult::pass("Connection", format!("Link object present for {}.", connection.address())));

        // Step 2: link alive
        let alive = connection.is_connected().await;
        let detail = format!("Link reports connected: {alive}. Manager status connected: {is_connected}.");
        report.steps.push(if alive && is_connected {
            StepResult::pass("Link alive", detail)
        } else {
            StepResult::fail("Link alive", detail)
        });

        // Step 3: raw channel
        match connection.raw_channel() {
            Some(channel) => {
                report
                    .steps
                    .push(StepResult::pass("Raw channel", "Bidirectional channel available."));
                report.steps.push(
                    self.status_step(
                        channel.as_ref(),
                        "Printer status (DLE EOT 1)",
                        &QUERY_PRINTER_STATUS,
                        self.settings.status_timeout,
                        describe_printer_status,
                    )
                    .await,
                );
                report.steps.push(
                    self.status_step(
                        channel.as_ref(),
                        "Offline cause (DLE EOT 2)",
                        &QUERY_OFFLINE_STATUS,
                        self.settings.offline_timeout,
                        describe_offline_status,
                    )
                    .await,
                );
            }
            None => {
                report.degraded = true;
                report.steps.push(StepResult::pass(
                    "Raw channel",
                    "Not exposed by this link. Falling back to a one-way test.",
                ));
                report.steps.push(match connection.write(&INITIALIZE).await {
                    Ok(()) => StepResult::pass(
                        "Initialise (ESC @)",
                        format!("Sent {}. No reply can be read in this mode.", hex::encode_upper(INITIALIZE)),
                    ),
                    Err(e) => {
                        warn!(error = %e, "one-way diagnostic write failed");
                        StepResult::fail("Initialise (ESC @)", format!("Write failed: {e}"))
                    }
                });
            }
        }

        info!(passed = report.all_passed(), degraded = report.degraded, "diagnostics finished");
        report
    }

    // -- Step implementations -----------------------------------------------

    async fn status_step(
        &self,
        channel: &dyn RawChannel,
        name: &str,
        command: &[u8],
        timeout: Duration,
        describe: fn(u8) -> String,
    ) -> StepResult {
        match self.query(channel, command, timeout).await {
            Ok(Some(reply)) => {
                let summary = reply
                    .first()
                    .map(|byte| describe(*byte))
                    .unwrap_or_default();
                StepResult::pass(name, format!("Reply {} ({summary})", hex::encode_upper(&reply)))
            }
            Ok(None) => StepResult::fail(
                name,
                format!("No reply within {} ms.", timeout.as_millis()),
            ),
            Err(e) => StepResult::fail(name, format!("Channel error: {e}")),
        }
    }

    /// Send `command` and poll for a reply until `timeout`.
    async fn query(
        &self,
        channel: &dyn RawChannel,
        command: &[u8],
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let stale = channel.clear_input().await?;
        if stale > 0 {
            debug!(stale, "discarded unread input before query");
        }
        channel.send(command).await?;

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 32];
        loop {
            let n = channel.try_read(&mut buf).await?;
            if n > 0 {
                debug!(command = %hex::encode(command), reply = %hex::encode(&buf[..n]), "status reply");
                return Ok(Some(buf[..n].to_vec()));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

/// Decode the DLE EOT 1 status byte.
fn describe_printer_status(byte: u8) -> String {
    if byte & 0x08 != 0 {
        "offline".into()
    } else {
        "online".into()
    }
}

/// Decode the DLE EOT 2 offline-cause byte.
fn describe_offline_status(byte: u8) -> String {
    let mut causes = Vec::new();
    if byte & 0x04 != 0 {
        causes.push("cover open");
    }
    if byte & 0x08 != 0 {
        causes.push("feed button pressed");
    }
    if byte & 0x20 != 0 {
        causes.push("paper end");
    }
    if byte & 0x40 != 0 {
        causes.push("error");
    }
    if causes.is_empty() {
        "no fault".into()
    } else {
        causes.join(", ")
    }
}
