// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for counter staff.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the operator surface presents it.

use crate::error::BondruckerError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Radio glitch, busy printer: we can retry automatically.
    Transient,
    /// Someone must act (switch the printer on, pair it, load paper).
    ActionRequired,
    /// Retrying or user action cannot fix it.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the operator should try.
    pub suggestion: String,
    /// Whether the system should auto-retry.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `BondruckerError` into something the person at the till can act on.
pub fn humanize_error(err: &BondruckerError) -> HumanError {
    match err {
        // -- Connection --
        BondruckerError::DeviceNotFound(address) => HumanError {
            message: "The printer couldn't be found.".into(),
            suggestion: format!(
                "Check the printer is switched on and close to this device, then scan again. ({address})"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BondruckerError::PairingFailed { .. } => HumanError {
            message: "The printer didn't accept the pairing request.".into(),
            suggestion: "Confirm the pairing prompt on this device. Some printers need a PIN such as 0000 or 1234.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BondruckerError::ConnectionFailed { .. } => HumanError {
            message: "We couldn't open a connection to the printer.".into(),
            suggestion: "Turn the printer off and on again. Make sure no other phone or tablet is connected to it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BondruckerError::UnsupportedPrinterType(kind) => HumanError {
            message: "This kind of printer isn't supported yet.".into(),
            suggestion: format!("Only Bluetooth receipt printers can be used right now. (Type: {kind:?})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        BondruckerError::NotConnected(_) => HumanError {
            message: "The printer is not connected.".into(),
            suggestion: "We'll reconnect automatically. If it keeps failing, check the printer is on.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BondruckerError::Transport(detail) => humanize_transport_error(detail),

        BondruckerError::BluetoothUnavailable => HumanError {
            message: "Bluetooth is switched off.".into(),
            suggestion: "Turn Bluetooth on in this device's settings, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Content --
        BondruckerError::Format(_) => HumanError {
            message: "The receipt couldn't be laid out.".into(),
            suggestion: "A simplified receipt will be printed instead. Please report this order.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Queue --
        BondruckerError::QueueExhausted { order_id, .. } => HumanError {
            message: "A receipt could not be printed.".into(),
            suggestion: format!("We tried several times. Check the printer and reprint order {order_id} by hand."),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BondruckerError::OrderNotFound(order_id) => HumanError {
            message: "The order couldn't be loaded.".into(),
            suggestion: format!("Order {order_id} may have been removed. Refresh the order list."),
            retriable: false,
            severity: Severity::Permanent,
        },

        BondruckerError::Repository(_) => HumanError {
            message: "We couldn't reach the order system.".into(),
            suggestion: "Check the internet connection. The receipt will be retried.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Storage --
        BondruckerError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app isn't allowed to save its settings.".into(),
                    suggestion: "Check the permissions of the settings folder.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing settings.".into(),
                    suggestion: "Try again. If this keeps happening, the device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        BondruckerError::Serialization(_) => HumanError {
            message: "The saved printer settings are damaged.".into(),
            suggestion: "Set up the printer again from the printer list.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BondruckerError::PlatformUnavailable => HumanError {
            message: "Printing isn't available on this device.".into(),
            suggestion: "Bluetooth printing needs a phone or tablet with Bluetooth.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Map radio-level failure text to advice.
fn humanize_transport_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") || lower.contains("timeout") {
        HumanError {
            message: "The printer didn't respond in time.".into(),
            suggestion: "The printer might be asleep or out of range. Move closer and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("broken pipe") || lower.contains("reset") || lower.contains("closed") {
        HumanError {
            message: "The connection to the printer dropped.".into(),
            suggestion: "We'll reconnect and try again automatically.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("paper") {
        HumanError {
            message: "The printer is out of paper.".into(),
            suggestion: "Load a new roll and close the cover, then print again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("cover") {
        HumanError {
            message: "The printer cover is open.".into(),
            suggestion: "Close the cover firmly, then print again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The printer had a problem.".into(),
            suggestion: format!("Try again. If this keeps happening, restart the printer. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrinterType;

    #[test]
    fn timeout_is_transient() {
        let err = BondruckerError::Transport("read timed out after 1500 ms".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn bluetooth_off_is_action_required() {
        let human = humanize_error(&BondruckerError::BluetoothUnavailable);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn out_of_paper_is_action_required() {
        let human = humanize_error(&BondruckerError::Transport("paper end sensor".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn unsupported_type_is_permanent() {
        let human = humanize_error(&BondruckerError::UnsupportedPrinterType(PrinterType::Usb));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("Usb"));
    }

    #[test]
    fn exhausted_queue_names_the_order() {
        let err = BondruckerError::QueueExhausted { order_id: 1017, rounds: 4 };
        assert!(humanize_error(&err).suggestion.contains("1017"));
    }
}
