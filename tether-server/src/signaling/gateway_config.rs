use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Настройки WebSocket шлюза.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Брать адрес клиента из `X-Forwarded-For` (сервер за reverse proxy).
    pub trust_forwarded_for: bool,
}

impl GatewayConfig {
    pub fn resolve_remote_addr(&self, peer: SocketAddr, headers: &HeaderMap) -> SocketAddr {
        if !self.trust_forwarded_for {
            return peer;
        }

        headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
            .map(|ip| SocketAddr::new(ip, peer.port()))
            .unwrap_or(peer)
    }
}
