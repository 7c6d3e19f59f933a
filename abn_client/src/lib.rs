mod bot;
mod context;
mod error;
mod round;
mod service;
mod session;
mod stdio;
mod store;
#[cfg(test)]
mod testing;

pub use bot::*;
pub use context::*;
pub use error::*;
pub use round::*;
pub use service::*;
pub use session::*;
pub use stdio::*;
pub use store::*;
