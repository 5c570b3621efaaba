use huddle_core::RoomId;

/// Load of one open room, as seen by the room manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLoad {
    pub room_id: RoomId,
    pub members: usize,
    /// Increases with every room opened.
    pub opened: u64,
}

/// Picks the room for a join that did not name one.
pub trait RoomAssigner: Send + Sync {
    /// `None` asks for a fresh room.
    fn assign(&self, rooms: &[RoomLoad], capacity: usize) -> Option<RoomId>;
}

/// Oldest room with a free seat, otherwise a new one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FillFirstAssigner;

impl RoomAssigner for FillFirstAssigner {
    fn assign(&self, rooms: &[RoomLoad], capacity: usize) -> Option<RoomId> {
        rooms
            .iter()
            .filter(|r| r.members < capacity)
            .min_by_key(|r| r.opened)
            .map(|r| r.room_id.clone())
    }
}
