use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref PROXY_URI_PATTERN: Regex = Regex::new(
        r"^(?P<protocol>https?|socks5h?)://(?:(?P<user>[^:@/\s]+):(?P<pass>[^@/\s]+)@)?(?P<host>[A-Za-z0-9.-]+):(?P<port>\d{1,5})/?$",
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
    Socks5h,
}

impl ProxyProtocol {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks5" => Some(ProxyProtocol::Socks5),
            "socks5h" => Some(ProxyProtocol::Socks5h),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
            ProxyProtocol::Socks5h => "socks5h",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStatus {
    Active,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
    pub credentials: Option<ProxyCredentials>,
    pub success_count: u64,
    pub consecutive_failure_count: u32,
    pub status: ProxyStatus,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProxyUriError {
    #[error("'{0}' does not match protocol://[user:pass@]host:port")]
    Malformed(String),
    #[error("port out of range in '{0}'")]
    InvalidPort(String),
}

impl ProxyEndpoint {
    pub fn parse(uri: &str) -> Result<Self, ProxyUriError> {
        let uri = uri.trim();
        let captures = PROXY_URI_PATTERN
            .captures(uri)
            .ok_or_else(|| ProxyUriError::Malformed(uri.to_string()))?;

        let protocol = ProxyProtocol::from_scheme(&captures["protocol"])
            .ok_or_else(|| ProxyUriError::Malformed(uri.to_string()))?;
        let port = match captures["port"].parse::<u16>() {
            Ok(0) | Err(_) => return Err(ProxyUriError::InvalidPort(uri.to_string())),
            Ok(port) => port,
        };
        let credentials = match (captures.name("user"), captures.name("pass")) {
            (Some(user), Some(pass)) => Some(ProxyCredentials {
                username: user.as_str().to_string(),
                password: pass.as_str().to_string(),
            }),
            _ => None,
        };

        Ok(ProxyEndpoint {
            protocol,
            host: captures["host"].to_string(),
            port,
            credentials,
            success_count: 0,
            consecutive_failure_count: 0,
            status: ProxyStatus::Active,
        })
    }

    /// Full uri including credentials, suitable for `reqwest::Proxy::all`.
    pub fn proxy_url(&self) -> String {
        match &self.credentials {
            Some(c) => format!(
                "{}://{}:{}@{}:{}",
                self.protocol.as_str(),
                c.username,
                c.password,
                self.host,
                self.port
            ),
            None => format!("{}://{}:{}", self.protocol.as_str(), self.host, self.port),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProxyStatus::Active
    }
}

// Never prints the password, so endpoints can go straight into log lines.
impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            Some(c) => write!(
                f,
                "{}://{}:***@{}:{}",
                self.protocol.as_str(),
                c.username,
                self.host,
                self.port
            ),
            None => write!(f, "{}://{}:{}", self.protocol.as_str(), self.host, self.port),
        }
    }
}
