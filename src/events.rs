//! Structured lifecycle events.
//!
//! The orchestrator reports what it decided through an [`EventSink`] rather
//! than formatting log lines itself. [`LogSink`] is the default and renders
//! events through the `log` facade.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::san::SubjectAltName;
use crate::store::PermissionOutcome;

/// Why an existing pair was not reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerateReason {
    Missing,
    Unreadable { path: PathBuf, error: String },
    InvalidFormat { path: PathBuf },
}

impl fmt::Display for RegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegenerateReason::Missing => f.write_str("certificate or key missing"),
            RegenerateReason::Unreadable { path, error } => {
                write!(f, "{} unreadable: {error}", path.display())
            }
            RegenerateReason::InvalidFormat { path } => {
                write!(f, "{} is not valid PEM", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertEvent {
    ReusedExisting {
        cert_path: PathBuf,
        key_path: PathBuf,
    },
    Regenerating {
        reason: RegenerateReason,
    },
    Generated {
        cert_path: PathBuf,
        key_path: PathBuf,
        subject_alt_names: Vec<SubjectAltName>,
    },
    KeyPermissions {
        key_path: PathBuf,
        outcome: PermissionOutcome,
    },
    /// Advisory only; the pair is still reused.
    ExpiryWarning {
        cert_path: PathBuf,
        days_remaining: i64,
    },
    LoadedCustom {
        cert_path: PathBuf,
        key_path: PathBuf,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CertEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &CertEvent) {
        (**self).emit(event)
    }
}

/// Renders events through `log`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &CertEvent) {
        match event {
            CertEvent::ReusedExisting { cert_path, .. } => {
                log::info!("Valid certificate already exists at {}", cert_path.display());
            }
            CertEvent::Regenerating { reason } => {
                log::warn!("Regenerating certificate: {reason}");
            }
            CertEvent::Generated {
                cert_path,
                key_path,
                subject_alt_names,
            } => {
                let sans: Vec<String> = subject_alt_names.iter().map(ToString::to_string).collect();
                log::info!(
                    "Generated self-signed certificate at {} (key {})",
                    cert_path.display(),
                    key_path.display()
                );
                log::info!("Subject alternative names: {}", sans.join(", "));
            }
            CertEvent::KeyPermissions { key_path, outcome } => match outcome {
                PermissionOutcome::Applied => {
                    log::debug!("Restricted {} to owner read/write", key_path.display());
                }
                other => log::debug!("Key permissions for {}: {other}", key_path.display()),
            },
            CertEvent::ExpiryWarning {
                cert_path,
                days_remaining,
            } => {
                if *days_remaining < 0 {
                    log::warn!(
                        "Certificate {} has expired, delete it to regenerate",
                        cert_path.display()
                    );
                } else {
                    log::warn!(
                        "Certificate {} expires within {days_remaining} days, consider regenerating",
                        cert_path.display()
                    );
                }
            }
            CertEvent::LoadedCustom {
                cert_path,
                key_path,
            } => {
                log::info!(
                    "Using operator-supplied certificate {} with key {}",
                    cert_path.display(),
                    key_path.display()
                );
            }
        }
    }
}

/// Keeps every event in memory, for callers that want to inspect decisions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CertEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<CertEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &CertEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
