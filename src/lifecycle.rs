//! Startup decision between reusing, generating, or loading operator-supplied
//! certificate material.

use std::io;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::config::CertificateOptions;
use crate::error::{CertError, Result};
use crate::events::{CertEvent, EventSink, LogSink, RegenerateReason};
use crate::generator::{CertificateGenerator, ORGANIZATION};
use crate::inspect::inspect_pem;
use crate::lock::with_directory_lock;
use crate::net::{AddressDiscovery, SystemInterfaces};
use crate::san::build_san_list;
use crate::store::{self, CertPaths, PemSection, ReadOutcome};

/// Reused certificates expiring sooner than this trigger an advisory event.
const EXPIRY_WARNING_DAYS: i64 = 30;

/// Certificate and key ready to hand to a TLS listener.
#[derive(Clone)]
pub struct CertificateBundle {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_pem: String,
    pub key_pem: String,
    /// True when this call produced new material.
    pub generated: bool,
    /// Outcome of restricting the key file, when this call wrote it.
    pub key_permissions: Option<store::PermissionOutcome>,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .field("generated", &self.generated)
            .field("key_permissions", &self.key_permissions)
            .finish_non_exhaustive()
    }
}

/// Composes discovery, SAN building, generation and storage.
///
/// Holds no certificate state between calls; the filesystem is the only
/// durable record.
pub struct CertificateManager {
    generator: CertificateGenerator,
    discovery: Box<dyn AddressDiscovery>,
    events: Box<dyn EventSink>,
}

impl Default for CertificateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateManager {
    /// RSA keys, host interface discovery, events rendered through `log`.
    pub fn new() -> Self {
        Self {
            generator: CertificateGenerator::default(),
            discovery: Box::new(SystemInterfaces),
            events: Box::new(LogSink),
        }
    }

    pub fn with_generator(mut self, generator: CertificateGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_discovery(mut self, discovery: impl AddressDiscovery + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    pub fn with_events(mut self, events: impl EventSink + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    /// Always produce and persist a new pair, replacing any existing files.
    pub fn generate(&self, options: &CertificateOptions) -> Result<CertificateBundle> {
        options.validate()?;
        store::ensure_directory(&options.certs_dir)?;
        with_directory_lock(&options.certs_dir, || self.generate_locked(options))
    }

    /// Reuse a structurally valid pair from the certs directory, otherwise
    /// generate one. Missing, unreadable or malformed files are never
    /// reported; only failures of the fresh generation are.
    pub fn load_or_generate(&self, options: &CertificateOptions) -> Result<CertificateBundle> {
        options.validate()?;
        store::ensure_directory(&options.certs_dir)?;
        with_directory_lock(&options.certs_dir, || {
            let paths = CertPaths::in_dir(&options.certs_dir)?;

            let reason = match store::read_existing(&paths.cert, &paths.key) {
                ReadOutcome::Found { cert_pem, key_pem } => {
                    match store::check_structure(&cert_pem, &key_pem) {
                        Ok(()) => {
                            self.events.emit(&CertEvent::ReusedExisting {
                                cert_path: paths.cert.clone(),
                                key_path: paths.key.clone(),
                            });
                            self.advise_expiry(&paths.cert, &cert_pem);
                            return Ok(CertificateBundle {
                                cert_path: paths.cert,
                                key_path: paths.key,
                                cert_pem,
                                key_pem,
                                generated: false,
                                key_permissions: None,
                            });
                        }
                        Err(section) => RegenerateReason::InvalidFormat {
                            path: section_path(&paths, section).to_path_buf(),
                        },
                    }
                }
                ReadOutcome::NotFound => RegenerateReason::Missing,
                ReadOutcome::Unreadable { path, source } => RegenerateReason::Unreadable {
                    path,
                    error: source.to_string(),
                },
            };

            self.events.emit(&CertEvent::Regenerating { reason });
            self.generate_locked(options)
        })
    }

    /// Load an operator-supplied pair as-is. Never falls back to generation.
    ///
    /// The certificate is always checked before the key, both for existence
    /// and for format, so the error names the first offending file.
    pub fn load_custom(&self, cert_path: &Path, key_path: &Path) -> Result<CertificateBundle> {
        require_file(cert_path)?;
        require_file(key_path)?;

        let cert_pem = read_required(cert_path)?;
        let key_pem = read_required(key_path)?;

        if let Err(section) = store::check_structure(&cert_pem, &key_pem) {
            let path = match section {
                PemSection::Certificate => cert_path,
                PemSection::PrivateKey => key_path,
            };
            return Err(CertError::InvalidFormat {
                path: path.to_path_buf(),
            });
        }

        let cert_path = absolute(cert_path)?;
        let key_path = absolute(key_path)?;
        self.events.emit(&CertEvent::LoadedCustom {
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
        });

        Ok(CertificateBundle {
            cert_path,
            key_path,
            cert_pem,
            key_pem,
            generated: false,
            key_permissions: None,
        })
    }

    fn generate_locked(&self, options: &CertificateOptions) -> Result<CertificateBundle> {
        let paths = CertPaths::in_dir(&options.certs_dir)?;

        let discovered = self.discovery.discover_local_ipv4();
        let sans = build_san_list(&options.alt_names, &discovered);

        let pair = self.generator.generate(
            &options.common_name,
            ORGANIZATION,
            &sans,
            options.validity_days,
        )?;

        store::persist(&paths.cert, &paths.key, &pair.cert_pem, &pair.key_pem)?;
        let outcome = store::restrict_key_permissions(&paths.key);

        self.events.emit(&CertEvent::Generated {
            cert_path: paths.cert.clone(),
            key_path: paths.key.clone(),
            subject_alt_names: sans,
        });
        self.events.emit(&CertEvent::KeyPermissions {
            key_path: paths.key.clone(),
            outcome: outcome.clone(),
        });

        Ok(CertificateBundle {
            cert_path: paths.cert,
            key_path: paths.key,
            cert_pem: pair.cert_pem,
            key_pem: pair.key_pem,
            generated: true,
            key_permissions: Some(outcome),
        })
    }

    fn advise_expiry(&self, cert_path: &Path, cert_pem: &str) {
        let summary = match inspect_pem(cert_pem) {
            Ok(summary) => summary,
            Err(e) => {
                log::debug!("Skipping expiry check for {}: {e}", cert_path.display());
                return;
            }
        };

        let days_remaining = summary.days_remaining(OffsetDateTime::now_utc().unix_timestamp());
        if days_remaining < EXPIRY_WARNING_DAYS {
            self.events.emit(&CertEvent::ExpiryWarning {
                cert_path: cert_path.to_path_buf(),
                days_remaining,
            });
        }
    }
}

/// [`CertificateManager::generate`] with the default manager.
pub fn generate(options: &CertificateOptions) -> Result<CertificateBundle> {
    CertificateManager::new().generate(options)
}

/// [`CertificateManager::load_or_generate`] with the default manager.
pub fn load_or_generate(options: &CertificateOptions) -> Result<CertificateBundle> {
    CertificateManager::new().load_or_generate(options)
}

/// [`CertificateManager::load_custom`] with the default manager.
pub fn load_custom(cert_path: &Path, key_path: &Path) -> Result<CertificateBundle> {
    CertificateManager::new().load_custom(cert_path, key_path)
}

fn section_path(paths: &CertPaths, section: PemSection) -> &Path {
    match section {
        PemSection::Certificate => &paths.cert,
        PemSection::PrivateKey => &paths.key,
    }
}

fn require_file(path: &Path) -> Result<()> {
    match path.try_exists() {
        Ok(true) => Ok(()),
        Ok(false) => Err(CertError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CertError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_required(path: &Path) -> Result<String> {
    store::read_pem_text(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CertError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CertError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|source| CertError::Io {
        path: path.to_path_buf(),
        source,
    })
}
