mod negotiation;
mod render;

pub use negotiation::*;
pub use render::*;
