//! Client for the land-registry chaincode.
//!
//! In `FABRIC` mode calls go to a Fabric gateway over its REST surface; in
//! `MOCK` mode (no connection profile, no enrolled identity, or no gateway
//! answering) they are logged and acknowledged locally so the rest of the
//! backend behaves the same either way.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

pub mod enroll;
pub mod wallet;

pub use wallet::{FileSystemWallet, Identity};

pub const USER_CONTRACT: &str = "user-contract";
pub const PROPERTY_CONTRACT: &str = "property-contract";
pub const OFFER_CONTRACT: &str = "offer-contract";
pub const ESCROW_CONTRACT: &str = "escrow-contract";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{contract}.{function}: gateway unreachable: {source}")]
    Transport {
        contract: String,
        function: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{contract}.{function} rejected with {status}: {message}")]
    Rejected {
        contract: String,
        function: String,
        status: u16,
        message: String,
    },

    #[error("{contract}.{function}: unreadable gateway response: {message}")]
    Decode {
        contract: String,
        function: String,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct FabricConfig {
    pub gateway_url: Option<String>,
    pub connection_profile: PathBuf,
    pub wallet_dir: PathBuf,
    pub identity: String,
    pub channel: String,
    pub msp_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerMode {
    Fabric,
    Mock,
}

impl LedgerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerMode::Fabric => "FABRIC",
            LedgerMode::Mock => "MOCK",
        }
    }
}

/// Outcome of a submitted chaincode transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub tx_id: String,
    pub payload: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayReply {
    #[serde(default)]
    tx_id: Option<String>,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    http: Client,
    base_url: String,
    channel: String,
    identity: String,
    msp_id: String,
}

#[derive(Debug, Clone)]
pub enum FabricClient {
    Mock,
    Gateway(Gateway),
}

impl FabricClient {
    pub fn mock() -> Self {
        FabricClient::Mock
    }

    /// Probes the network the way the server does at start-up and falls back
    /// to mock mode on the first missing piece.
    pub async fn connect(config: &FabricConfig) -> Self {
        log::info!("Attempting to connect to Hyperledger Fabric...");

        if !config.connection_profile.exists() {
            log::warn!(
                "Connection profile {} not found. Running in MOCK mode.",
                config.connection_profile.display()
            );
            return FabricClient::Mock;
        }
        if let Err(e) = fs::read_to_string(&config.connection_profile)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(|e| e.to_string()))
        {
            log::warn!("Unreadable connection profile ({}). Running in MOCK mode.", e);
            return FabricClient::Mock;
        }

        let wallet = FileSystemWallet::new(&config.wallet_dir);
        let identity = match wallet.get(&config.identity) {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                log::warn!(
                    "Identity '{}' not found in wallet. Run: enroll-admin. Running in MOCK mode.",
                    config.identity
                );
                return FabricClient::Mock;
            }
            Err(e) => {
                log::warn!("{}. Running in MOCK mode.", e);
                return FabricClient::Mock;
            }
        };

        let Some(base_url) = config.gateway_url.clone() else {
            log::warn!("FABRIC_GATEWAY_URL is not set. Running in MOCK mode.");
            return FabricClient::Mock;
        };
        let msp_id = if identity.msp_id.is_empty() {
            config.msp_id.clone()
        } else {
            identity.msp_id
        };
        let gateway = match Gateway::new(&base_url, &config.channel, &config.identity, &msp_id) {
            Ok(gateway) => gateway,
            Err(e) => {
                log::warn!("Failed to build gateway client: {}. Running in MOCK mode.", e);
                return FabricClient::Mock;
            }
        };

        let probe = gateway
            .http
            .get(format!("{}/health", gateway.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        match probe {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                log::warn!(
                    "Fabric gateway answered {}. Running in MOCK mode.",
                    response.status()
                );
                return FabricClient::Mock;
            }
            Err(e) => {
                log::warn!("Failed to connect to Fabric: {}. Running in MOCK mode.", e);
                return FabricClient::Mock;
            }
        }

        log::info!(
            "Connected to Fabric network {} on channel {}",
            gateway.base_url,
            gateway.channel
        );
        FabricClient::Gateway(gateway)
    }

    pub fn mode(&self) -> LedgerMode {
        match self {
            FabricClient::Mock => LedgerMode::Mock,
            FabricClient::Gateway(_) => LedgerMode::Fabric,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.mode() == LedgerMode::Fabric
    }

    /// Submits a state-changing transaction and waits for the gateway to
    /// commit it.
    pub async fn submit(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<LedgerReceipt, LedgerError> {
        match self {
            FabricClient::Mock => {
                log::info!("[MOCK] {}.{} {:?}", contract, function, args);
                Ok(LedgerReceipt {
                    tx_id: format!("MOCK_{}", Uuid::new_v4().simple()),
                    payload: json!(args),
                })
            }
            FabricClient::Gateway(gateway) => {
                log::info!("Fabric: {}.{} {:?}", contract, function, args);
                let reply = gateway.call("transactions", contract, function, args).await?;
                let tx_id = reply
                    .tx_id
                    .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
                log::debug!("{}.{} committed as {}", contract, function, tx_id);
                Ok(LedgerReceipt {
                    tx_id,
                    payload: reply.result,
                })
            }
        }
    }

    /// Read-only chaincode query. Mock mode has no ledger to read and
    /// answers with an empty list.
    pub async fn evaluate(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Value, LedgerError> {
        match self {
            FabricClient::Mock => {
                log::debug!("[MOCK Query] {}.{} {:?}", contract, function, args);
                Ok(json!([]))
            }
            FabricClient::Gateway(gateway) => {
                log::debug!("Fabric Query: {}.{} {:?}", contract, function, args);
                Ok(gateway.call("queries", contract, function, args).await?.result)
            }
        }
    }
}

impl Gateway {
    /// Client for the gateway at `base_url`, acting as `identity` of `msp_id`.
    /// Does not contact the gateway.
    pub fn new(
        base_url: &str,
        channel: &str,
        identity: &str,
        msp_id: &str,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel: channel.to_string(),
            identity: identity.to_string(),
            msp_id: msp_id.to_string(),
        })
    }

    async fn call(
        &self,
        kind: &str,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<GatewayReply, LedgerError> {
        let url = format!(
            "{}/channels/{}/chaincodes/{}/{}",
            self.base_url, self.channel, contract, kind
        );
        let body = json!({
            "function": function,
            "args": args,
            "identity": self.identity,
            "mspId": self.msp_id,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| LedgerError::Transport {
                contract: contract.to_string(),
                function: function.to_string(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| LedgerError::Transport {
            contract: contract.to_string(),
            function: function.to_string(),
            source,
        })?;

        if !status.is_success() {
            log::error!("Fabric {}.{} failed: {} {}", contract, function, status, text);
            return Err(LedgerError::Rejected {
                contract: contract.to_string(),
                function: function.to_string(),
                status: status.as_u16(),
                message: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(GatewayReply::default());
        }
        serde_json::from_str(&text).map_err(|e| LedgerError::Decode {
            contract: contract.to_string(),
            function: function.to_string(),
            message: e.to_string(),
        })
    }
}

/// Formats a chaincode numeric argument; the chaincode parses every argument
/// from a string.
pub fn number_arg(value: f64) -> String {
    value.to_string()
}
