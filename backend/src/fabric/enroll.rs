//! Imports the organisation admin's certificate and key from a
//! `crypto-config` tree into the wallet.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::wallet::{FileSystemWallet, Identity, WalletError};

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed connection profile: {0}")]
    Profile(#[from] serde_json::Error),

    #[error("admin certificate not found at {0}; generate crypto-config first")]
    MissingCertificate(PathBuf),

    #[error("no private key in {0}")]
    EmptyKeystore(PathBuf),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

#[derive(Debug, Clone)]
pub struct EnrollConfig {
    pub connection_profile: PathBuf,
    pub wallet_dir: PathBuf,
    pub identity: String,
    pub crypto_config: PathBuf,
    pub org: String,
    pub msp_id: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EnrollOutcome {
    AlreadyEnrolled,
    Imported(PathBuf),
}

fn read(path: &Path) -> Result<String, EnrollError> {
    fs::read_to_string(path).map_err(|source| EnrollError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl EnrollConfig {
    fn msp_dir(&self) -> PathBuf {
        self.crypto_config
            .join("peerOrganizations")
            .join(&self.org)
            .join("users")
            .join(format!("Admin@{}", self.org))
            .join("msp")
    }

    pub fn certificate_path(&self) -> PathBuf {
        self.msp_dir()
            .join("signcerts")
            .join(format!("Admin@{}-cert.pem", self.org))
    }

    pub fn keystore_dir(&self) -> PathBuf {
        self.msp_dir().join("keystore")
    }
}

pub fn enroll_admin(config: &EnrollConfig) -> Result<EnrollOutcome, EnrollError> {
    let profile: Value = serde_json::from_str(&read(&config.connection_profile)?)?;
    let ca_name = format!("ca.{}", config.org);
    match profile["certificateAuthorities"][&ca_name]["url"].as_str() {
        Some(url) => log::info!("Certificate authority {} at {}", ca_name, url),
        None => log::warn!("Connection profile has no certificate authority {}", ca_name),
    }

    let wallet = FileSystemWallet::new(&config.wallet_dir);
    if wallet.get(&config.identity)?.is_some() {
        return Ok(EnrollOutcome::AlreadyEnrolled);
    }

    let cert_path = config.certificate_path();
    if !cert_path.exists() {
        return Err(EnrollError::MissingCertificate(cert_path));
    }
    let certificate = read(&cert_path)?;

    let keystore = config.keystore_dir();
    let mut keys: Vec<PathBuf> = fs::read_dir(&keystore)
        .map_err(|source| EnrollError::Read {
            path: keystore.clone(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    keys.sort();
    let key_path = keys
        .into_iter()
        .next()
        .ok_or_else(|| EnrollError::EmptyKeystore(keystore.clone()))?;
    let private_key = read(&key_path)?;

    wallet.put(
        &config.identity,
        &Identity::x509(certificate, private_key, &config.msp_id),
    )?;
    Ok(EnrollOutcome::Imported(wallet.path_of(&config.identity)))
}
