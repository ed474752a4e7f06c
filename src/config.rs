use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CertError, Result};

/// Common name used when the operator does not supply one.
pub const DEFAULT_COMMON_NAME: &str = "GamePanel";
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        const APP_DIR: &str = "GamePanel";
    } else {
        const APP_DIR: &str = "gamepanel";
    }
}

fn default_common_name() -> String {
    DEFAULT_COMMON_NAME.to_string()
}

fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

/// Inputs for one lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateOptions {
    pub certs_dir: PathBuf,
    #[serde(default = "default_common_name")]
    pub common_name: String,
    /// DNS names or dotted-quad IPv4 literals, in any order.
    #[serde(default)]
    pub alt_names: Vec<String>,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
}

impl CertificateOptions {
    pub fn new(certs_dir: impl Into<PathBuf>) -> Self {
        Self {
            certs_dir: certs_dir.into(),
            common_name: default_common_name(),
            alt_names: Vec::new(),
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }

    pub fn common_name(mut self, name: impl Into<String>) -> Self {
        self.common_name = name.into();
        self
    }

    pub fn alt_name(mut self, name: impl Into<String>) -> Self {
        self.alt_names.push(name.into());
        self
    }

    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.validity_days == 0 {
            return Err(CertError::InvalidOptions(
                "validity_days must be positive".to_string(),
            ));
        }
        if self.certs_dir.as_os_str().is_empty() {
            return Err(CertError::InvalidOptions(
                "certs_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The `[tls]` table of the panel configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default = "default_certs_dir")]
    pub certs_dir: PathBuf,
    #[serde(default = "default_common_name")]
    pub common_name: String,
    #[serde(default)]
    pub alt_names: Vec<String>,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    /// Operator-supplied certificate. Must be set together with `key_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            certs_dir: default_certs_dir(),
            common_name: default_common_name(),
            alt_names: Vec::new(),
            validity_days: DEFAULT_VALIDITY_DAYS,
            cert_path: None,
            key_path: None,
        }
    }
}

/// Wrapper matching the file layout (`[tls]` table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub tls: TlsConfig,
}

impl PanelConfig {
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl TlsConfig {
    pub fn options(&self) -> CertificateOptions {
        CertificateOptions {
            certs_dir: self.certs_dir.clone(),
            common_name: self.common_name.clone(),
            alt_names: self.alt_names.clone(),
            validity_days: self.validity_days,
        }
    }

    /// Operator-supplied paths, if configured. Setting only one is an error.
    pub fn custom_paths(&self) -> Result<Option<(&Path, &Path)>> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Ok(Some((cert.as_path(), key.as_path()))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(CertError::InvalidOptions(
                "cert_path is set but key_path is missing".to_string(),
            )),
            (None, Some(_)) => Err(CertError::InvalidOptions(
                "key_path is set but cert_path is missing".to_string(),
            )),
        }
    }
}

/// Per-user certs directory, falling back to the temp dir when no home exists.
pub fn default_certs_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir);

    base.join(APP_DIR).join("certs")
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("certs.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let opts = CertificateOptions::new("/tmp/certs");
        assert_eq!(opts.common_name, "GamePanel");
        assert_eq!(opts.validity_days, 365);
        assert!(opts.alt_names.is_empty());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn zero_validity_is_invalid() {
        let err = CertificateOptions::new("/tmp/certs")
            .validity_days(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, CertError::InvalidOptions(_)));
    }

    #[test]
    fn options_from_toml_fill_defaults() {
        let opts: CertificateOptions = toml::from_str(r#"certs_dir = "/srv/panel/certs""#).unwrap();
        assert_eq!(opts, CertificateOptions::new("/srv/panel/certs"));
    }

    #[test]
    fn panel_config_parses_tls_table() {
        let cfg = PanelConfig::from_toml_str(
            r#"
            [tls]
            certs_dir = "/srv/panel/certs"
            alt_names = ["play.example.net", "203.0.113.5"]
            validity_days = 90
            "#,
        )
        .unwrap();

        let opts = cfg.tls.options();
        assert_eq!(opts.certs_dir, PathBuf::from("/srv/panel/certs"));
        assert_eq!(opts.alt_names, vec!["play.example.net", "203.0.113.5"]);
        assert_eq!(opts.validity_days, 90);
        assert_eq!(opts.common_name, DEFAULT_COMMON_NAME);
        assert!(cfg.tls.custom_paths().unwrap().is_none());
    }

    #[test]
    fn default_config_round_trips() {
        let cfg = PanelConfig::default();
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(PanelConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn custom_paths_need_both_halves() {
        let mut tls = TlsConfig {
            cert_path: Some("/etc/panel/cert.pem".into()),
            ..TlsConfig::default()
        };
        assert!(matches!(tls.custom_paths(), Err(CertError::InvalidOptions(_))));

        tls.key_path = Some("/etc/panel/key.pem".into());
        let (cert, key) = tls.custom_paths().unwrap().unwrap();
        assert_eq!(cert, Path::new("/etc/panel/cert.pem"));
        assert_eq!(key, Path::new("/etc/panel/key.pem"));
    }
}
