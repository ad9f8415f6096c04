// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded retry schedules for connecting and printing.
//
// Classifies errors into Transient (auto-retry), UserAction (wait for the
// operator), and Permanent (give up). Only transient errors consume the
// remaining attempts; the others stop the loop immediately.

use std::time::Duration;

use bondrucker_core::error::BondruckerError;
use bondrucker_core::types::ErrorClass;
use tracing::{debug, info, warn};

/// How the pause between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same pause after every failed attempt.
    Fixed,
    /// Pause after attempt `n` is `n × base`.
    Linear,
}

/// Retry schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryConfig {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: Backoff::Linear,
        }
    }

    /// Pause to take after failed attempt `attempt` (1-based), or `None` when
    /// it was the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
        })
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry: the error is permanent or needs the operator.
    GiveUp(ErrorClass),
    /// All attempts used.
    Exhausted,
}

/// Classify a `BondruckerError` into an `ErrorClass` for retry decisions.
pub fn classify_error(err: &BondruckerError) -> ErrorClass {
    match err {
        BondruckerError::ConnectionFailed { .. } => ErrorClass::Transient,
        BondruckerError::NotConnected(_) => ErrorClass::Transient,
        BondruckerError::Repository(_) => ErrorClass::Transient,
        BondruckerError::Transport(detail) => classify_transport_detail(detail),

        BondruckerError::DeviceNotFound(_) => ErrorClass::UserAction,
        BondruckerError::PairingFailed { .. } => ErrorClass::UserAction,
        BondruckerError::BluetoothUnavailable => ErrorClass::UserAction,
        BondruckerError::QueueExhausted { .. } => ErrorClass::UserAction,

        BondruckerError::UnsupportedPrinterType(_) => ErrorClass::Permanent,
        BondruckerError::Format(_) => ErrorClass::Permanent,
        BondruckerError::OrderNotFound(_) => ErrorClass::Permanent,
        BondruckerError::Serialization(_) => ErrorClass::Permanent,
        BondruckerError::PlatformUnavailable => ErrorClass::Permanent,

        BondruckerError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::UserAction
            }
            _ => ErrorClass::Transient,
        },
    }
}

/// Classify free-form failure text reported by the radio stack.
fn classify_transport_detail(detail: &str) -> ErrorClass {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("paper") || lower.contains("cover") {
        return ErrorClass::UserAction;
    }
    if lower.contains("not supported") || lower.contains("invalid address") {
        return ErrorClass::Permanent;
    }
    // Timeouts, refused/reset sockets and busy radios all clear up on their own
    // often enough to be worth another attempt.
    ErrorClass::Transient
}

/// Decide whether to retry after failed attempt `attempt` (1-based).
pub fn should_retry(err: &BondruckerError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!(error = %err, "permanent error, not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::UserAction => {
            info!(error = %err, "operator action required, not retrying");
            RetryDecision::GiveUp(ErrorClass::UserAction)
        }
        ErrorClass::Transient => match config.delay_after(attempt) {
            Some(delay) => {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling retry");
                RetryDecision::RetryAfter(delay)
            }
            None => {
                warn!(attempt, max = config.max_attempts, "retry limit exhausted");
                RetryDecision::Exhausted
            }
        },
    }
}
