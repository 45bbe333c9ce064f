use async_trait::async_trait;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::net::SocketAddr;
use tether_core::UserId;

/// What the identity provider gets to see of an incoming connection.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub remote_addr: SocketAddr,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` rejects the connection.
    async fn resolve_identity(&self, handshake: &Handshake) -> Option<UserId>;
}

/// Uses the `access_token` query parameter verbatim as the identity.
#[derive(Debug, Clone, Default)]
pub struct AccessTokenIdentity;

impl AccessTokenIdentity {
    pub const PARAM: &'static str = "access_token";
}

#[async_trait]
impl IdentityProvider for AccessTokenIdentity {
    async fn resolve_identity(&self, handshake: &Handshake) -> Option<UserId> {
        handshake
            .query
            .get(Self::PARAM)
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(UserId::from)
    }
}
