mod app_state;
mod registry;
mod relay;
mod signaling;

pub use app_state::*;
pub use registry::*;
pub use relay::*;
pub use signaling::*;
