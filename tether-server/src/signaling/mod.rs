mod gateway_config;
mod identity;
mod signaling_output;
mod signaling_service;
mod ws_handler;

pub use gateway_config::*;
pub use identity::*;
pub use signaling_output::*;
pub use signaling_service::*;
pub use ws_handler::*;
