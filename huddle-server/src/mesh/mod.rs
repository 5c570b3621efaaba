mod lifecycle;
mod peer_connection;

pub use lifecycle::*;
pub use peer_connection::*;
