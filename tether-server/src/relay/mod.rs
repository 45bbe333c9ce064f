mod relay_config;
mod relay_error;
mod relay_handler;
mod session_gate;

pub use relay_config::*;
pub use relay_error::*;
pub use relay_handler::*;
pub use session_gate::*;
