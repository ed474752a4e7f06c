//! Certificate lifecycle manager for the game server admin panel.
//!
//! At startup the panel either reuses the `server.crt`/`server.key` pair in
//! its certs directory, generates a fresh self-signed pair with a SAN set
//! covering loopback, local interfaces and operator-supplied names, or loads
//! a pair the operator points at explicitly. The resulting
//! [`CertificateBundle`] is handed to the TLS listener; nothing is kept in
//! memory between calls.

pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod inspect;
pub mod lifecycle;
mod lock;
pub mod net;
pub mod san;
pub mod store;

pub use config::{CertificateOptions, PanelConfig, TlsConfig};
pub use error::{CertError, Result};
pub use events::{CertEvent, EventSink, LogSink, RecordingSink, RegenerateReason};
pub use generator::{CertificateGenerator, KeySource, RsaKeySource};
pub use lifecycle::{CertificateBundle, CertificateManager, generate, load_custom, load_or_generate};
pub use net::{AddressDiscovery, FixedAddresses, SystemInterfaces, discover_local_ipv4};
pub use san::{SubjectAltName, build_san_list, classify};
pub use store::PermissionOutcome;
