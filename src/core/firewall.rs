/// Host firewall rules for the database port
///
/// Issues `sudo ufw allow from <source> to any port <port> proto <proto>`.
/// The console user is expected to have a sudoers entry for ufw.

use std::net::IpAddr;
use tracing::info;

use super::console::Console;
use super::error::ConsoleError;
use super::executor::{ExternalCommand, OperationResult};

/// Accepts a plain address or `address/prefix`
pub fn validate_source(input: Option<&str>) -> Result<String, ConsoleError> {
    let source = input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConsoleError::validation("No IP address provided."))?;

    let (addr, prefix) = match source.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (source, None),
    };

    let ip: IpAddr = addr
        .parse()
        .map_err(|_| ConsoleError::validation("Invalid IP address."))?;

    if let Some(prefix) = prefix {
        let max = if ip.is_ipv4() { 32 } else { 128 };
        match prefix.parse::<u8>() {
            Ok(bits) if bits <= max => {}
            _ => return Err(ConsoleError::validation("Invalid IP address.")),
        }
    }

    Ok(source.to_string())
}

pub fn allow_command(source: &str, port: u16, protocol: &str) -> ExternalCommand {
    ExternalCommand::new("sudo")
        .args(["ufw", "allow", "from", source, "to", "any", "port"])
        .arg(port.to_string())
        .args(["proto", protocol])
        .capture()
}

impl Console {
    pub async fn add_network_rule(&self, ip: Option<&str>) -> Result<OperationResult, ConsoleError> {
        let source = validate_source(ip)?;
        info!(source = %source, port = self.db_port(), "allowing database access");
        let command = allow_command(&source, self.db_port(), self.db_protocol());
        Ok(self.runner().run(command).await)
    }
}
