mod codec;
mod endpoint;
mod error;
mod protocol;

pub use codec::*;
pub use endpoint::*;
pub use error::*;
pub use protocol::*;
