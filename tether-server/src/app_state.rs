use crate::relay::{RelayConfig, RelayHandler};
use crate::signaling::{GatewayConfig, IdentityProvider, SignalingService};
use std::sync::Arc;

/// Shared state of the HTTP/WebSocket layer.
pub struct AppState {
    pub signaling: SignalingService,
    pub relay: RelayHandler,
    pub identity: Arc<dyn IdentityProvider>,
    pub gateway: GatewayConfig,
}

impl AppState {
    pub fn new(
        relay_config: RelayConfig,
        gateway: GatewayConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Arc<Self> {
        let signaling = SignalingService::new();
        let relay = RelayHandler::new(Arc::new(signaling.clone()), relay_config);

        Arc::new(Self {
            signaling,
            relay,
            identity,
            gateway,
        })
    }
}
