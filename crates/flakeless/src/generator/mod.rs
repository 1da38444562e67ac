mod config;
mod flakeless;
mod state;

pub use config::*;
pub use flakeless::*;
pub use state::*;
