//! Port-based protocol classification

use crate::proxy::models::ProxyType;

/// Ports conventionally served by SOCKS5 proxies
const DEFAULT_SOCKS5_PORTS: &[u16] = &[1080];

/// Ports conventionally served by SOCKS4 proxies
const DEFAULT_SOCKS4_PORTS: &[u16] = &[1081];

/// Maps `address:port` strings to a protocol using the port number.
///
/// Any port that is not listed as SOCKS is HTTP, which covers the common
/// HTTP proxy ports (80, 8080, 3128, 8000, 8888) without listing them.
#[derive(Debug, Clone)]
pub struct Classifier {
    socks5_ports: Vec<u16>,
    socks4_ports: Vec<u16>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            socks5_ports: DEFAULT_SOCKS5_PORTS.to_vec(),
            socks4_ports: DEFAULT_SOCKS4_PORTS.to_vec(),
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_socks5_ports(mut self, ports: Vec<u16>) -> Self {
        self.socks5_ports = ports;
        self
    }

    pub fn with_socks4_ports(mut self, ports: Vec<u16>) -> Self {
        self.socks4_ports = ports;
        self
    }

    /// Classify a raw candidate string.
    ///
    /// Returns [`ProxyType::Unknown`] when the string does not split on its
    /// last `:` into a non-empty host and a non-empty port.
    pub fn classify(&self, raw: &str) -> ProxyType {
        let Some((host, port)) = raw.rsplit_once(':') else {
            return ProxyType::Unknown;
        };
        if host.is_empty() || port.is_empty() {
            return ProxyType::Unknown;
        }

        match port.parse::<u16>() {
            Ok(p) if self.socks5_ports.contains(&p) => ProxyType::Socks5,
            Ok(p) if self.socks4_ports.contains(&p) => ProxyType::Socks4,
            _ => ProxyType::Http,
        }
    }
}

/// Classify with the default port table
pub fn classify(raw: &str) -> ProxyType {
    Classifier::default().classify(raw)
}
