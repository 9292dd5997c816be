//! File-system wallet holding X.509 identities as `<label>.id` JSON files,
//! the layout the Fabric SDK wallets read and write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed wallet identity: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub certificate: String,
    pub private_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub credentials: Credentials,
    pub msp_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
}

impl Identity {
    pub fn x509(certificate: String, private_key: String, msp_id: &str) -> Self {
        Self {
            credentials: Credentials {
                certificate,
                private_key,
            },
            msp_id: msp_id.to_string(),
            kind: "X.509".to_string(),
            version: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileSystemWallet {
    dir: PathBuf,
}

impl FileSystemWallet {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_of(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}.id", label))
    }

    /// `Ok(None)` when no identity is stored under `label`.
    pub fn get(&self, label: &str) -> Result<Option<Identity>, WalletError> {
        let path = self.path_of(label);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn put(&self, label: &str, identity: &Identity) -> Result<(), WalletError> {
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string_pretty(identity)?;
        fs::write(self.path_of(label), raw)?;
        Ok(())
    }
}
