mod cli;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use panel_certs::config::{PanelConfig, TlsConfig, default_config_path};
use panel_certs::inspect::inspect_pem;
use panel_certs::store::CertPaths;
use panel_certs::{CertificateBundle, CertificateManager};

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(e) = real_main() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let args = cli::Args::parse();

    let cfg_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut tls = load_config(&cfg_path)?.tls;
    if let Some(dir) = args.certs_dir {
        tls.certs_dir = dir;
    }

    match args.sub.unwrap_or(cli::Cmd::Ensure) {
        cli::Cmd::Ensure => handle_ensure(&tls),
        cli::Cmd::Generate => handle_generate(&tls),
        cli::Cmd::Inspect { cert, json } => handle_inspect(&tls, cert.as_deref(), json),
    }
}

/// Read the config, writing the default first if none exists yet.
fn load_config(cfg_path: &Path) -> Result<PanelConfig> {
    if !cfg_path.exists() {
        info!(
            "Config not found at {}, creating default configuration",
            cfg_path.display()
        );

        if let Some(parent) = cfg_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_toml = PanelConfig::default()
            .to_toml_string()
            .context("Failed to serialize default config")?;
        fs::write(cfg_path, default_toml).context("Failed to write config file")?;

        info!("Created default configuration at {}", cfg_path.display());
    }

    let cfg_str = fs::read_to_string(cfg_path).context("Failed to read config file")?;
    let cfg = PanelConfig::from_toml_str(&cfg_str).context("Failed to parse config")?;

    info!("Using config from: {}", cfg_path.display());
    Ok(cfg)
}

fn handle_ensure(tls: &TlsConfig) -> Result<()> {
    let manager = CertificateManager::new();
    let bundle = match tls.custom_paths()? {
        Some((cert, key)) => manager
            .load_custom(cert, key)
            .context("Operator-supplied certificate rejected")?,
        None => manager
            .load_or_generate(&tls.options())
            .context("Failed to prepare TLS certificate")?,
    };
    report(&bundle);
    Ok(())
}

fn handle_generate(tls: &TlsConfig) -> Result<()> {
    if tls.custom_paths()?.is_some() {
        anyhow::bail!("cert_path/key_path are configured; refusing to generate over operator-supplied material");
    }
    let bundle = CertificateManager::new()
        .generate(&tls.options())
        .context("Failed to generate TLS certificate")?;
    report(&bundle);
    Ok(())
}

fn handle_inspect(tls: &TlsConfig, cert: Option<&Path>, json: bool) -> Result<()> {
    let cert_path = match cert {
        Some(path) => path.to_path_buf(),
        None => CertPaths::in_dir(&tls.certs_dir)?.cert,
    };

    let pem = fs::read_to_string(&cert_path)
        .with_context(|| format!("Failed to read certificate {}", cert_path.display()))?;
    let summary = inspect_pem(&pem)
        .with_context(|| format!("Failed to inspect {}", cert_path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
        return Ok(());
    }

    println!("certificate: {}", cert_path.display());
    println!(
        "subject:     CN={} O={}",
        summary.common_name.as_deref().unwrap_or("-"),
        summary.organization.as_deref().unwrap_or("-")
    );
    println!("not before:  {}", format_timestamp(summary.not_before));
    println!("not after:   {}", format_timestamp(summary.not_after));
    for san in &summary.subject_alt_names {
        println!("san:         {san}");
    }
    println!("key:         {:?}", summary.key_algorithm);
    Ok(())
}

fn format_timestamp(unix: i64) -> String {
    time::OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_else(|| unix.to_string())
}

fn report(bundle: &CertificateBundle) {
    println!("cert: {}", bundle.cert_path.display());
    println!("key:  {}", bundle.key_path.display());
    println!(
        "{}",
        if bundle.generated {
            "generated new self-signed certificate"
        } else {
            "reused existing certificate"
        }
    );
}
