pub mod initiator;
pub mod model;

pub use initiator::{PairRoles, Role, local_role, resolve_initiator};
pub use model::*;
