use config::{Config, ConfigError, Environment, File};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::fabric::enroll::EnrollConfig;
use crate::fabric::FabricConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Json,
    Postgres,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub require_auth: bool,
    pub storage: StorageKind,
    pub data_file: String,
    pub database_url: Option<String>,
    pub flush_interval_secs: u64,
    pub seed_demo_users: bool,
    pub fabric_gateway_url: Option<String>,
    pub fabric_connection_profile: String,
    pub fabric_wallet_dir: String,
    pub fabric_identity: String,
    pub fabric_channel: String,
    pub fabric_msp_id: String,
    pub fabric_crypto_config: String,
    pub fabric_org: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            jwt_secret: "landchain-dev-secret".to_string(),
            require_auth: false,
            storage: StorageKind::Memory,
            data_file: "data/landchain.json".to_string(),
            database_url: None,
            flush_interval_secs: 5,
            seed_demo_users: true,
            fabric_gateway_url: None,
            fabric_connection_profile: "connection-profile.json".to_string(),
            fabric_wallet_dir: "wallet".to_string(),
            fabric_identity: "admin".to_string(),
            fabric_channel: "landregistry".to_string(),
            fabric_msp_id: "Org1MSP".to_string(),
            fabric_crypto_config: "../crypto-config".to_string(),
            fabric_org: "org1.landregistry.com".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `landchain.{toml,json,yaml}` if present, then the
    /// environment (`.env` included), e.g. `PORT`, `STORAGE`, `FABRIC_GATEWAY_URL`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env file if present
        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("landchain").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn fabric(&self) -> FabricConfig {
        FabricConfig {
            gateway_url: self.fabric_gateway_url.clone().filter(|url| !url.is_empty()),
            connection_profile: PathBuf::from(&self.fabric_connection_profile),
            wallet_dir: PathBuf::from(&self.fabric_wallet_dir),
            identity: self.fabric_identity.clone(),
            channel: self.fabric_channel.clone(),
            msp_id: self.fabric_msp_id.clone(),
        }
    }

    pub fn enroll(&self) -> EnrollConfig {
        EnrollConfig {
            connection_profile: PathBuf::from(&self.fabric_connection_profile),
            wallet_dir: PathBuf::from(&self.fabric_wallet_dir),
            identity: self.fabric_identity.clone(),
            crypto_config: PathBuf::from(&self.fabric_crypto_config),
            org: self.fabric_org.clone(),
            msp_id: self.fabric_msp_id.clone(),
        }
    }
}
