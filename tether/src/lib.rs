pub use tether_core::{ConnectionId, UserId};

pub mod model {
    pub use tether_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use tether_server::*;
}
