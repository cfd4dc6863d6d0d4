use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::ProfileId;

/// Profile ids that belong to a room or channel, in join order.
///
/// Inserting is a set union: an id already present is left where it is.
/// Duplicates coming from storage are collapsed on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MemberSet(Vec<ProfileId>);

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only `owner`.
    pub fn with_owner(owner: ProfileId) -> Self {
        Self(vec![owner])
    }

    /// Returns `true` if `id` was not already a member.
    pub fn insert(&mut self, id: ProfileId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn contains(&self, id: &ProfileId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProfileId> {
        self.0.iter()
    }
}

impl FromIterator<ProfileId> for MemberSet {
    fn from_iter<I: IntoIterator<Item = ProfileId>>(iter: I) -> Self {
        let mut set = MemberSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'de> Deserialize<'de> for MemberSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<ProfileId>::deserialize(deserializer).map(MemberSet::from_iter)
    }
}

/// Something with an owner and a member set, where the owner must always be a
/// member. Rooms and channels both implement this.
pub trait Membership {
    fn owner(&self) -> ProfileId;
    fn members(&self) -> &MemberSet;
    fn members_mut(&mut self) -> &mut MemberSet;

    /// Adds `id` to the members. Returns `true` if the set changed.
    fn add_member(&mut self, id: ProfileId) -> bool {
        self.members_mut().insert(id)
    }

    /// Puts the owner back into the member set if it went missing.
    fn ensure_owner_member(&mut self) -> bool {
        let owner = self.owner();
        self.members_mut().insert(owner)
    }

    fn is_member(&self, id: &ProfileId) -> bool {
        self.owner() == *id || self.members().contains(id)
    }
}
