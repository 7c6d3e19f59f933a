pub use cards::*;
pub use combat::*;
pub use errors::*;
pub use hand::*;
pub use protocol::*;
pub use team::*;

#[cfg(test)]
mod arbitrary;
mod cards;
mod combat;
mod errors;
mod hand;
mod protocol;
mod team;
