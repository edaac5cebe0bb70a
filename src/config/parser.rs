//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    models::Config,
    error::{AppError, Result},
    config::env::EnvManager,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        let problems = EnvManager::validate_current_env();
        if !problems.is_empty() {
            return Err(AppError::config(problems.join("; ")));
        }
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if !self.cli.methods.is_empty() {
            config.methods = self.cli.methods.iter().map(|m| m.trim().to_string()).collect();
        }

        if let Some(duration) = self.cli.duration {
            config.duration_seconds = duration;
        }

        if let Some(port) = self.cli.http_port {
            config.http_port = port;
        }
        if let Some(port) = self.cli.server_port {
            config.base_server_port = port;
        }
        if let Some(port) = self.cli.client_port {
            config.base_client_port = port;
        }

        if let Some(transfer) = self.cli.transfer {
            config.transfer = transfer;
        }

        if let Some(ref path) = self.cli.singbox {
            config.singbox_path = path.clone();
        }
        if let Some(ref path) = self.cli.curl {
            config.curl_path = path.clone();
        }
        if let Some(ref path) = self.cli.openssl {
            config.openssl_path = path.clone();
        }

        if self.cli.no_color {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        // CLI-only switches
        config.keep_workdir = self.cli.keep_workdir;
        config.json_output = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: methods={}, duration={}s, transfer={:?}",
                config.methods.len(),
                config.duration_seconds,
                config.transfer
            );
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Methods: {}", config.methods.join(", ")));
    summary.push(format!("sing-box: {}", config.singbox_path));
    summary.push(format!("openssl: {}", config.openssl_path));
    summary.push(format!("Transfer: {:?} (curl: {})", config.transfer, config.curl_path));
    summary.push(format!("Duration: {}s", config.duration_seconds));
    summary.push(format!("Byte Ceiling: {}", config.max_test_bytes));
    summary.push(format!("HTTP Port: {}", config.http_port));
    summary.push(format!("First Ports: {}", config.base_ports()));
    summary.push(format!("Keep Workdir: {}", config.keep_workdir));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
