//! Client configuration: endpoint selection, transports and reconnection policy.

use std::{fmt, str::FromStr, time::Duration};

use crate::error::ClientError;

/// Default port of the presence backend
pub const DEFAULT_PORT: u16 = 3000;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the client runs. Decides the default endpoint host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Android emulator: the host machine is reachable via 10.0.2.2
    AndroidEmulator,
    /// Physical device, iOS simulator or desktop
    #[default]
    Device,
}

impl Platform {
    pub fn default_endpoint(self) -> String {
        match self {
            Platform::AndroidEmulator => format!("http://10.0.2.2:{}", DEFAULT_PORT),
            Platform::Device => format!("http://localhost:{}", DEFAULT_PORT),
        }
    }
}

impl FromStr for Platform {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "emulator" | "android-emulator" => Ok(Platform::AndroidEmulator),
            "device" | "simulator" | "desktop" => Ok(Platform::Device),
            other => Err(ClientError::Config(format!("unknown platform '{}'", other))),
        }
    }
}

/// Transport used to carry frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// HTTP long-polling
    Polling,
    /// Persistent WebSocket stream
    WebSocket,
}

impl TransportKind {
    pub fn is_streaming(self) -> bool {
        matches!(self, TransportKind::WebSocket)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Polling => f.write_str("polling"),
            TransportKind::WebSocket => f.write_str("websocket"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polling" => Ok(TransportKind::Polling),
            "websocket" | "ws" => Ok(TransportKind::WebSocket),
            other => Err(ClientError::Config(format!("unknown transport '{}'", other))),
        }
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts tolerated before giving up
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Configuration of a [`ConnectionManager`](crate::connection::ConnectionManager)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://localhost:3000`
    pub endpoint: String,
    /// Transports in order of preference
    pub transports: Vec<TransportKind>,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_platform(Platform::default())
    }
}

impl ClientConfig {
    /// Defaults for the given platform: polling first, then upgrade to WebSocket
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            endpoint: platform.default_endpoint(),
            transports: vec![TransportKind::Polling, TransportKind::WebSocket],
            reconnect: ReconnectPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_transports(mut self, transports: Vec<TransportKind>) -> Self {
        self.transports = transports;
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check the configuration before any connection attempt.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.transports.is_empty() {
            return Err(ClientError::Config("no transports configured".to_string()));
        }
        if self.reconnect.base_delay.is_zero() || self.reconnect.max_delay.is_zero() {
            return Err(ClientError::Config(
                "reconnection delays must be positive".to_string(),
            ));
        }
        if self.reconnect.base_delay > self.reconnect.max_delay {
            return Err(ClientError::Config(
                "base delay must not exceed max delay".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ClientError::Config(
                "connect timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// WebSocket URL derived from the endpoint
    pub fn websocket_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws", base)
    }

    /// Long-polling URL derived from the endpoint
    pub fn polling_url(&self) -> String {
        format!("{}/poll", self.endpoint.trim_end_matches('/'))
    }

    /// REST API base URL derived from the endpoint
    pub fn api_url(&self) -> String {
        format!("{}/api", self.endpoint.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_per_platform() {
        // テスト項目: プラットフォームごとに異なるループバックアドレスが選ばれる
        // given (前提条件):
        let emulator = Platform::AndroidEmulator;
        let device = Platform::Device;

        // when (操作):
        let emulator_endpoint = emulator.default_endpoint();
        let device_endpoint = device.default_endpoint();

        // then (期待する結果):
        assert_eq!(emulator_endpoint, "http://10.0.2.2:3000");
        assert_eq!(device_endpoint, "http://localhost:3000");
    }

    #[test]
    fn test_default_config_prefers_polling_then_websocket() {
        // テスト項目: デフォルトのトランスポート順は polling → websocket
        // given (前提条件):

        // when (操作):
        let config = ClientConfig::default();

        // then (期待する結果):
        assert_eq!(
            config.transports,
            vec![TransportKind::Polling, TransportKind::WebSocket]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_websocket_url_from_https_endpoint() {
        // テスト項目: https のエンドポイントから wss の URL が作られる
        // given (前提条件):
        let config = ClientConfig::default().with_endpoint("https://kibun.example.com/");

        // when (操作):
        let url = config.websocket_url();

        // then (期待する結果):
        assert_eq!(url, "wss://kibun.example.com/ws");
        assert_eq!(config.polling_url(), "https://kibun.example.com/poll");
        assert_eq!(config.api_url(), "https://kibun.example.com/api");
    }

    #[test]
    fn test_validate_rejects_empty_transports() {
        // テスト項目: トランスポートが空の設定は不正
        // given (前提条件):
        let config = ClientConfig::default().with_transports(vec![]);

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        // テスト項目: base_delay > max_delay の設定は不正
        // given (前提条件):
        let config = ClientConfig::default().with_reconnect(ReconnectPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
        });

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        // テスト項目: http(s) 以外のエンドポイントは不正
        // given (前提条件):
        let config = ClientConfig::default().with_endpoint("ftp://example.com");

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_parse_transport_and_platform() {
        // テスト項目: 文字列からトランスポートとプラットフォームを解析できる
        // given (前提条件):

        // when (操作) / then (期待する結果):
        assert_eq!("ws".parse::<TransportKind>().unwrap(), TransportKind::WebSocket);
        assert_eq!("Polling".parse::<TransportKind>().unwrap(), TransportKind::Polling);
        assert_eq!(
            "emulator".parse::<Platform>().unwrap(),
            Platform::AndroidEmulator
        );
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
    }
}
