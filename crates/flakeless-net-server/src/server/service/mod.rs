mod connection;
mod handler;

pub use handler::*;
