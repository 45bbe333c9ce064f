mod registry;
mod registry_error;
mod room;
mod user;

pub use registry::*;
pub use registry_error::*;
pub use room::*;
pub use user::*;
