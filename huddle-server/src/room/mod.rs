mod assignment;
mod coordinator;
mod registry;
mod room;
mod room_command;
mod room_event;
mod room_manager;
mod timers;

pub use assignment::*;
pub use coordinator::*;
pub use registry::*;
pub use room::*;
pub use room_command::*;
pub use room_event::*;
pub use room_manager::*;
pub use timers::*;
