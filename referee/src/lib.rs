mod config;
mod game;
mod local;
mod player;
mod recording;
mod table;
pub use config::*;
pub use game::*;
pub use local::*;
pub use player::*;
pub use recording::*;
pub use table::*;
