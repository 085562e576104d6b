// src/network/rig.rs

//! Mining rig command interface
//!
//! Talks to a CGMiner-compatible API: one JSON request per TCP connection,
//! answered with a JSON document (NUL-terminated) that the rig closes the
//! connection after.
use crate::types::{PoolStatus, RigPool};
use crate::utils::error::SwitchError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

/// Configuration for connecting to the rig's API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// API host
    #[serde(default = "default_host")]
    pub host: String,
    /// API port (CGMiner listens on 4028)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds allowed per request, connect included
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    4028
}

fn default_timeout() -> u64 {
    5
}

impl Default for RigConfig {
    fn default() -> Self {
        RigConfig {
            host: default_host(),
            port: default_port(),
            timeout: default_timeout(),
        }
    }
}

/// Rig software and API versions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RigVersion {
    /// Miner software version
    pub miner: String,
    /// API version
    pub api: String,
}

/// Rig performance summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigSummary {
    /// Average hash rate in H/s
    pub hash_rate: f64,
}

/// Information about the coin the rig is currently mining
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinInfo {
    /// Network difficulty reported by the active pool
    pub network_difficulty: f64,
}

/// Result of a pool priority change
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityResponse {
    /// Whether the rig accepted the new order
    pub success: bool,
    /// Rig's status message
    pub message: String,
}

/// Outcome of a restart request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The rig acknowledged the restart
    Restarted,
    /// The rig had no running session to restart
    AlreadyStopped,
}

/// Commands the control loop issues to the rig
///
/// Every call may fail with `SwitchError::RigUnreachable`; callers decide
/// whether that is fatal.
#[allow(async_fn_in_trait)]
pub trait RigActuator {
    /// Miner and API versions; doubles as a liveness probe
    async fn version(&self) -> Result<RigVersion, SwitchError>;

    /// Current average hash rate
    async fn summary(&self) -> Result<RigSummary, SwitchError>;

    /// All configured pools in rig order
    async fn pools(&self) -> Result<Vec<RigPool>, SwitchError>;

    /// Reorders pools; `indices` lists pool numbers, highest priority first
    async fn set_pool_priority(&self, indices: &[usize]) -> Result<PriorityResponse, SwitchError>;

    /// Restarts the miner
    async fn restart(&self) -> Result<RestartOutcome, SwitchError>;

    /// Details of the coin currently being mined
    async fn coin(&self) -> Result<CoinInfo, SwitchError>;
}

impl<T: RigActuator + ?Sized> RigActuator for &T {
    async fn version(&self) -> Result<RigVersion, SwitchError> {
        (**self).version().await
    }

    async fn summary(&self) -> Result<RigSummary, SwitchError> {
        (**self).summary().await
    }

    async fn pools(&self) -> Result<Vec<RigPool>, SwitchError> {
        (**self).pools().await
    }

    async fn set_pool_priority(&self, indices: &[usize]) -> Result<PriorityResponse, SwitchError> {
        (**self).set_pool_priority(indices).await
    }

    async fn restart(&self) -> Result<RestartOutcome, SwitchError> {
        (**self).restart().await
    }

    async fn coin(&self) -> Result<CoinInfo, SwitchError> {
        (**self).coin().await
    }
}

/// Client for the CGMiner JSON API
pub struct CgminerClient {
    /// Rig connection configuration
    config: RigConfig,
}

impl CgminerClient {
    /// Creates a client; no connection is made until the first command
    pub fn new(config: RigConfig) -> Self {
        CgminerClient { config }
    }

    /// Sends one command and returns the raw response text
    async fn request(&self, command: &str, parameter: Option<&str>) -> Result<String, SwitchError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let mut message = json!({ "command": command });
        if let Some(parameter) = parameter {
            message["parameter"] = json!(parameter);
        }

        let exchange = async {
            let mut stream = TcpStream::connect(&address).await?;
            stream.write_all(message.to_string().as_bytes()).await?;
            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await?;
            Ok::<_, std::io::Error>(raw)
        };
        let raw = time::timeout(Duration::from_secs(self.config.timeout), exchange)
            .await?
            .map_err(|e| SwitchError::RigUnreachable(format!("{} ({}): {}", address, command, e)))?;

        let text = String::from_utf8_lossy(&raw);
        Ok(text.trim_end_matches(['\0', '\n', '\r', ' ']).to_string())
    }

    /// Sends one command and returns the parsed, status-checked response
    async fn command(&self, command: &str, parameter: Option<&str>) -> Result<Value, SwitchError> {
        let text = self.request(command, parameter).await?;
        let response: Value = serde_json::from_str(&text).map_err(|e| {
            SwitchError::ProtocolError(format!("{} returned invalid JSON: {}", command, e))
        })?;
        let (ok, message) = status(&response);
        if !ok {
            return Err(SwitchError::ProtocolError(format!(
                "{} failed: {}",
                command, message
            )));
        }
        Ok(response)
    }
}

/// Reads `STATUS[0]`: `S`/`I` are success, anything else is failure
fn status(response: &Value) -> (bool, String) {
    let entry = &response["STATUS"][0];
    let code = entry["STATUS"].as_str().unwrap_or("");
    let message = entry["Msg"].as_str().unwrap_or("no status message").to_string();
    (matches!(code, "S" | "I"), message)
}

fn first_section<'a>(response: &'a Value, section: &str) -> Result<&'a Value, SwitchError> {
    response[section]
        .get(0)
        .ok_or_else(|| SwitchError::ProtocolError(format!("Missing {} section", section)))
}

fn parse_pools(response: &Value) -> Result<Vec<RigPool>, SwitchError> {
    let pools = response["POOLS"]
        .as_array()
        .ok_or_else(|| SwitchError::ProtocolError("Missing POOLS section".to_string()))?;

    pools
        .iter()
        .map(|pool| {
            Ok(RigPool {
                url: pool["URL"]
                    .as_str()
                    .ok_or_else(|| SwitchError::ProtocolError("Missing pool URL".to_string()))?
                    .to_string(),
                status: PoolStatus::from(pool["Status"].as_str().unwrap_or("Unknown")),
                stratum_active: pool["Stratum Active"].as_bool().unwrap_or(false),
                index: pool["POOL"]
                    .as_u64()
                    .ok_or_else(|| SwitchError::ProtocolError("Missing pool number".to_string()))?
                    as usize,
            })
        })
        .collect()
}

fn parse_hash_rate(summary: &Value) -> Result<f64, SwitchError> {
    if let Some(mhs) = summary["MHS av"].as_f64() {
        return Ok(mhs * 1_000_000.0);
    }
    summary["KHS av"]
        .as_f64()
        .map(|khs| khs * 1_000.0)
        .ok_or_else(|| SwitchError::ProtocolError("Summary has no average hash rate".to_string()))
}

impl RigActuator for CgminerClient {
    async fn version(&self) -> Result<RigVersion, SwitchError> {
        let response = self.command("version", None).await?;
        let version = first_section(&response, "VERSION")?;
        Ok(RigVersion {
            miner: version["CGMiner"]
                .as_str()
                .or_else(|| version["BMMiner"].as_str())
                .unwrap_or("unknown")
                .to_string(),
            api: version["API"].as_str().unwrap_or("unknown").to_string(),
        })
    }

    async fn summary(&self) -> Result<RigSummary, SwitchError> {
        let response = self.command("summary", None).await?;
        Ok(RigSummary {
            hash_rate: parse_hash_rate(first_section(&response, "SUMMARY")?)?,
        })
    }

    async fn pools(&self) -> Result<Vec<RigPool>, SwitchError> {
        let response = self.command("pools", None).await?;
        parse_pools(&response)
    }

    async fn set_pool_priority(&self, indices: &[usize]) -> Result<PriorityResponse, SwitchError> {
        let parameter = indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let text = self.request("poolpriority", Some(&parameter)).await?;
        let response: Value = serde_json::from_str(&text).map_err(|e| {
            SwitchError::ProtocolError(format!("poolpriority returned invalid JSON: {}", e))
        })?;
        let (success, message) = status(&response);
        Ok(PriorityResponse { success, message })
    }

    async fn restart(&self) -> Result<RestartOutcome, SwitchError> {
        let text = self.request("restart", None).await?;
        // CGMiner answers a successful restart with bare "RESTART" text
        match serde_json::from_str::<Value>(&text) {
            Ok(response) if !status(&response).0 => Ok(RestartOutcome::AlreadyStopped),
            _ if text.is_empty() => Ok(RestartOutcome::AlreadyStopped),
            _ => Ok(RestartOutcome::Restarted),
        }
    }

    async fn coin(&self) -> Result<CoinInfo, SwitchError> {
        let response = self.command("coin", None).await?;
        let coin = first_section(&response, "COIN")?;
        Ok(CoinInfo {
            network_difficulty: coin["Network Difficulty"].as_f64().ok_or_else(|| {
                SwitchError::ProtocolError("Missing Network Difficulty".to_string())
            })?,
        })
    }
}
