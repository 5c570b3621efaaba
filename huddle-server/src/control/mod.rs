mod constraint;

pub use constraint::*;
