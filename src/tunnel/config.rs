//! sing-box configuration documents for a Shadowsocks server/client pair

use crate::error::{ErrorContext, Result};
use crate::models::{Method, PortPair};
use crate::tunnel::secret::Secret;
use serde::{Deserialize, Serialize};
use std::path::Path;

const LOOPBACK: &str = "127.0.0.1";
const SS_INBOUND_TAG: &str = "ss-in";
const SS_OUTBOUND_TAG: &str = "ss-out";
const SOCKS_INBOUND_TAG: &str = "socks-in";
const DIRECT_TAG: &str = "direct";

/// Top-level sing-box configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfig {
    pub log: LogOptions,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogOptions {
    pub level: String,
    pub timestamp: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "error".to_string(),
            timestamp: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inbound {
    Shadowsocks {
        tag: String,
        listen: String,
        listen_port: u16,
        method: String,
        password: String,
    },
    Socks {
        tag: String,
        listen: String,
        listen_port: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Shadowsocks {
        tag: String,
        server: String,
        server_port: u16,
        method: String,
        password: String,
    },
    Direct {
        tag: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    pub rules: Vec<RouteRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    pub outbound: String,
}

impl TunnelConfig {
    /// Write the document as pretty-printed JSON
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Read a document back from disk
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Matching server and client configs sharing one method and secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfigPair {
    pub server: TunnelConfig,
    pub client: TunnelConfig,
}

impl TunnelConfigPair {
    /// Build the pair for one iteration.
    ///
    /// The server exposes a Shadowsocks inbound on `ports.server` and egresses
    /// directly. The client exposes SOCKS on `ports.client` and routes every
    /// connection through the Shadowsocks outbound.
    pub fn generate(method: &Method, secret: &Secret, ports: PortPair) -> Self {
        let server = TunnelConfig {
            log: LogOptions::default(),
            inbounds: vec![Inbound::Shadowsocks {
                tag: SS_INBOUND_TAG.to_string(),
                listen: LOOPBACK.to_string(),
                listen_port: ports.server,
                method: method.to_string(),
                password: secret.as_str().to_string(),
            }],
            outbounds: vec![Outbound::Direct {
                tag: DIRECT_TAG.to_string(),
            }],
            route: None,
        };

        let client = TunnelConfig {
            log: LogOptions::default(),
            inbounds: vec![Inbound::Socks {
                tag: SOCKS_INBOUND_TAG.to_string(),
                listen: LOOPBACK.to_string(),
                listen_port: ports.client,
            }],
            outbounds: vec![
                Outbound::Shadowsocks {
                    tag: SS_OUTBOUND_TAG.to_string(),
                    server: LOOPBACK.to_string(),
                    server_port: ports.server,
                    method: method.to_string(),
                    password: secret.as_str().to_string(),
                },
                Outbound::Direct {
                    tag: DIRECT_TAG.to_string(),
                },
            ],
            route: Some(RouteOptions {
                rules: vec![RouteRule {
                    outbound: SS_OUTBOUND_TAG.to_string(),
                }],
            }),
        };

        Self { server, client }
    }

    /// Check that both sides agree on method, secret and server port
    pub fn is_consistent(&self) -> bool {
        let server_side = self.server.inbounds.iter().find_map(|inbound| match inbound {
            Inbound::Shadowsocks { listen_port, method, password, .. } => Some((*listen_port, method, password)),
            _ => None,
        });
        let client_side = self.client.outbounds.iter().find_map(|outbound| match outbound {
            Outbound::Shadowsocks { server_port, method, password, .. } => Some((*server_port, method, password)),
            _ => None,
        });
        matches!((server_side, client_side), (Some(s), Some(c)) if s == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_pair() -> TunnelConfigPair {
        let method = Method::new("aes-256-gcm").unwrap();
        let secret = Secret::new_unchecked("c2VjcmV0");
        TunnelConfigPair::generate(&method, &secret, PortPair::new(20000, 15000))
    }

    #[test]
    fn test_pair_is_consistent() {
        assert!(sample_pair().is_consistent());
    }

    #[test]
    fn test_server_schema() {
        let value = serde_json::to_value(&sample_pair().server).unwrap();
        assert_eq!(
            value,
            json!({
                "log": {"level": "error", "timestamp": false},
                "inbounds": [{
                    "type": "shadowsocks",
                    "tag": "ss-in",
                    "listen": "127.0.0.1",
                    "listen_port": 20000,
                    "method": "aes-256-gcm",
                    "password": "c2VjcmV0"
                }],
                "outbounds": [{"type": "direct", "tag": "direct"}]
            })
        );
    }

    #[test]
    fn test_client_schema() {
        let value = serde_json::to_value(&sample_pair().client).unwrap();
        assert_eq!(value["inbounds"][0]["type"], "socks");
        assert_eq!(value["inbounds"][0]["listen_port"], 15000);
        assert_eq!(value["outbounds"][0]["type"], "shadowsocks");
        assert_eq!(value["outbounds"][0]["server_port"], 20000);
        assert_eq!(value["outbounds"][0]["password"], "c2VjcmV0");
        assert_eq!(value["outbounds"][1]["type"], "direct");
        assert_eq!(value["route"], json!({"rules": [{"outbound": "ss-out"}]}));
    }

    #[test]
    fn test_inconsistent_pair_detected() {
        let mut pair = sample_pair();
        if let Some(Outbound::Shadowsocks { password, .. }) = pair.client.outbounds.first_mut() {
            *password = "other".to_string();
        }
        assert!(!pair.is_consistent());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client-aes-256-gcm.json");
        let pair = sample_pair();

        pair.client.write_to(&path).unwrap();
        let loaded = TunnelConfig::read_from(&path).unwrap();
        assert_eq!(loaded, pair.client);
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("server.json");
        let error = sample_pair().server.write_to(&path).unwrap_err();
        assert_eq!(error.category(), "IO");
    }
}
