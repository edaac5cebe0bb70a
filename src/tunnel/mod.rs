//! Shadowsocks tunnels: secrets, sing-box configs and the processes running them

pub mod config;
pub mod process;
pub mod secret;

pub use config::{Inbound, LogOptions, Outbound, RouteOptions, RouteRule, TunnelConfig, TunnelConfigPair};
pub use process::{SingBoxLauncher, TunnelHandle, TunnelLauncher, TunnelProcess, TunnelStack};
pub use secret::{OpensslSecretGenerator, Secret, SecretGenerator};
