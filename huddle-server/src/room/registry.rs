use crate::errors::CoordinatorError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use huddle_core::{Participant, ParticipantId, RoomId, RosterEntry};
use std::sync::Arc;

/// Which room each participant is in, shared by all rooms.
pub type Directory = Arc<DashMap<ParticipantId, RoomId>>;

/// Authoritative, join-ordered member list of one room.
pub struct MembershipRegistry {
    room_id: RoomId,
    directory: Directory,
    members: Vec<Participant>,
}

impl MembershipRegistry {
    pub fn new(room_id: RoomId, directory: Directory) -> Self {
        Self {
            room_id,
            directory,
            members: Vec::new(),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Rejects ids that are already a member of any room.
    pub fn join(
        &mut self,
        participant_id: ParticipantId,
        display_name: String,
    ) -> Result<Vec<RosterEntry>, CoordinatorError> {
        match self.directory.entry(participant_id.clone()) {
            Entry::Occupied(_) => return Err(CoordinatorError::DuplicateJoin(participant_id)),
            Entry::Vacant(slot) => {
                slot.insert(self.room_id.clone());
            }
        }

        self.members.push(Participant {
            id: participant_id,
            display_name,
            room_id: self.room_id.clone(),
        });
        Ok(self.roster())
    }

    /// `NotFound` for ids that are not members of this room.
    pub fn leave(
        &mut self,
        participant_id: &ParticipantId,
    ) -> Result<Vec<RosterEntry>, CoordinatorError> {
        let Some(index) = self.members.iter().position(|p| &p.id == participant_id) else {
            return Err(CoordinatorError::NotFound(participant_id.clone()));
        };

        self.members.remove(index);
        self.directory
            .remove_if(participant_id, |_, room| room == &self.room_id);
        Ok(self.roster())
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.members.iter().map(Participant::roster_entry).collect()
    }

    pub fn member_ids(&self) -> Vec<ParticipantId> {
        self.members.iter().map(|p| p.id.clone()).collect()
    }

    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.members.iter().any(|p| &p.id == participant_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Releases every directory entry held by this room.
    pub fn clear(&mut self) {
        for member in self.members.drain(..) {
            self.directory
                .remove_if(&member.id, |_, room| room == &self.room_id);
        }
    }
}

/// A room torn down without a clean shutdown still frees its members' ids.
impl Drop for MembershipRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
