//! Decentralized group registry: role-weighted peer ordering, an
//! in-memory ignore list applied both in-band (network call) and
//! out-of-band (event filtering), and moderation bookkeeping.

use std::time::Instant;
use toxide_net::{ChatId, GroupNumber, GroupPeerId, GroupRole, PublicKey, UserStatus};

#[derive(Debug, Clone)]
pub struct GroupPeer {
    pub id: GroupPeerId,
    pub pk: PublicKey,
    pub name: String,
    pub prev_name: String,
    pub status: UserStatus,
    pub role: GroupRole,
    pub is_ignored: bool,
    pub last_active: Option<Instant>,
}

fn role_rank(role: GroupRole) -> u8 {
    match role {
        GroupRole::Founder => 0,
        GroupRole::Moderator => 1,
        GroupRole::User => 2,
        GroupRole::Observer => 3,
    }
}

#[derive(Debug)]
pub struct Group {
    pub number: GroupNumber,
    pub chat_id: ChatId,
    pub name: String,
    pub topic: String,
    pub self_name: String,
    pub self_role: GroupRole,
    pub peers: Vec<GroupPeer>,
    /// Sorted names for sidebar display and tab completion.
    pub name_list: Vec<String>,
    /// Ignored keys persist across peer churn within the session.
    pub ignored_keys: Vec<PublicKey>,
    pub side_pos: usize,
    pub time_connected: Option<Instant>,
}

impl Group {
    pub fn new(number: GroupNumber, chat_id: ChatId) -> Self {
        Self {
            number,
            chat_id,
            name: String::new(),
            topic: String::new(),
            self_name: String::new(),
            self_role: GroupRole::User,
            peers: Vec::new(),
            name_list: Vec::new(),
            ignored_keys: Vec::new(),
            side_pos: 0,
            time_connected: None,
        }
    }

    /// Founder sorts above moderators, moderators above users,
    /// observers below everyone; names break ties case-insensitively.
    fn rebuild_name_list(&mut self) {
        let mut peers: Vec<&GroupPeer> = self.peers.iter().collect();
        peers.sort_by_cached_key(|p| (role_rank(p.role), p.name.to_lowercase()));
        self.name_list = peers.into_iter().map(|p| p.name.clone()).collect();
    }

    pub fn peer(&self, id: GroupPeerId) -> Option<&GroupPeer> {
        self.peers.iter().find(|p| p.id == id)
    }

    pub fn peer_mut(&mut self, id: GroupPeerId) -> Option<&mut GroupPeer> {
        self.peers.iter_mut().find(|p| p.id == id)
    }

    pub fn peer_by_name(&self, name: &str) -> Option<&GroupPeer> {
        self.peers.iter().find(|p| p.name == name)
    }

    pub fn add_peer(
        &mut self,
        id: GroupPeerId,
        pk: PublicKey,
        name: String,
        role: GroupRole,
        now: Instant,
    ) {
        let is_ignored = self.ignored_keys.contains(&pk);
        match self.peer_mut(id) {
            Some(peer) => {
                peer.pk = pk;
                peer.name = name;
                peer.role = role;
                peer.is_ignored = is_ignored;
                peer.last_active = Some(now);
            }
            None => self.peers.push(GroupPeer {
                id,
                pk,
                name,
                prev_name: String::new(),
                status: UserStatus::Online,
                role,
                is_ignored,
                last_active: Some(now),
            }),
        }
        self.rebuild_name_list();
    }

    pub fn remove_peer(&mut self, id: GroupPeerId) -> Option<GroupPeer> {
        let pos = self.peers.iter().position(|p| p.id == id)?;
        let peer = self.peers.remove(pos);
        self.rebuild_name_list();
        Some(peer)
    }

    /// Returns the old name on an actual change.
    pub fn rename_peer(&mut self, id: GroupPeerId, new_name: String) -> Option<String> {
        let peer = self.peer_mut(id)?;
        if peer.name == new_name {
            return None;
        }
        let old = std::mem::replace(&mut peer.name, new_name);
        peer.prev_name = old.clone();
        self.rebuild_name_list();
        Some(old)
    }

    pub fn set_peer_role(&mut self, id: GroupPeerId, role: GroupRole) {
        if let Some(peer) = self.peer_mut(id) {
            peer.role = role;
        }
        self.rebuild_name_list();
    }

    /// Marks the key ignored out-of-band; the in-band network call is
    /// the caller's job. Returns false when the peer is unknown.
    pub fn set_ignore(&mut self, id: GroupPeerId, ignore: bool) -> bool {
        let Some(peer) = self.peer_mut(id) else {
            return false;
        };
        peer.is_ignored = ignore;
        let pk = peer.pk;
        if ignore {
            if !self.ignored_keys.contains(&pk) {
                self.ignored_keys.push(pk);
            }
        } else {
            self.ignored_keys.retain(|k| k != &pk);
        }
        true
    }

    pub fn is_ignored(&self, id: GroupPeerId) -> bool {
        self.peer(id).map(|p| p.is_ignored).unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct GroupRegistry {
    list: Vec<Option<Group>>,
    max_idx: usize,
    index: Vec<usize>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_active(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn get(&self, number: GroupNumber) -> Option<&Group> {
        self.list.get(number.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, number: GroupNumber) -> Option<&mut Group> {
        self.list.get_mut(number.0 as usize)?.as_mut()
    }

    pub fn by_chat_id(&self, chat_id: &ChatId) -> Option<&Group> {
        self.iter().find(|g| &g.chat_id == chat_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.list[..self.max_idx].iter().flatten()
    }

    pub fn add(&mut self, group: Group) -> &mut Group {
        let slot = group.number.0 as usize;
        if slot >= self.list.len() {
            self.list.resize_with(slot + 1, || None);
        }
        self.list[slot] = Some(group);
        if slot + 1 > self.max_idx {
            self.max_idx = slot + 1;
        }
        self.sort();
        self.list[slot].as_mut().unwrap()
    }

    pub fn remove(&mut self, number: GroupNumber) -> Option<Group> {
        let removed = self.list.get_mut(number.0 as usize)?.take();
        if removed.is_some() {
            while self.max_idx > 0 && self.list[self.max_idx - 1].is_none() {
                self.max_idx -= 1;
            }
            self.sort();
        }
        removed
    }

    pub fn sort(&mut self) {
        let mut idx: Vec<usize> = (0..self.max_idx)
            .filter(|&i| self.list[i].is_some())
            .collect();
        idx.sort_by_cached_key(|&i| {
            let g = self.list[i].as_ref().unwrap();
            (g.name.to_lowercase(), g.number.0)
        });
        self.index = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_with_peers() -> Group {
        let mut g = Group::new(GroupNumber(0), ChatId([1; 32]));
        let now = Instant::now();
        g.add_peer(GroupPeerId(1), PublicKey([1; 32]), "ursula".into(), GroupRole::User, now);
        g.add_peer(GroupPeerId(2), PublicKey([2; 32]), "frank".into(), GroupRole::Founder, now);
        g.add_peer(GroupPeerId(3), PublicKey([3; 32]), "olive".into(), GroupRole::Observer, now);
        g.add_peer(GroupPeerId(4), PublicKey([4; 32]), "Mo".into(), GroupRole::Moderator, now);
        g.add_peer(GroupPeerId(5), PublicKey([5; 32]), "adam".into(), GroupRole::User, now);
        g
    }

    #[test]
    fn peers_sort_by_role_then_name() {
        let g = group_with_peers();
        assert_eq!(g.name_list, vec!["frank", "Mo", "adam", "ursula", "olive"]);
    }

    #[test]
    fn role_change_resorts() {
        let mut g = group_with_peers();
        g.set_peer_role(GroupPeerId(5), GroupRole::Observer);
        assert_eq!(g.name_list, vec!["frank", "Mo", "ursula", "adam", "olive"]);
    }

    #[test]
    fn ignore_persists_across_rejoin() {
        let mut g = group_with_peers();
        assert!(g.set_ignore(GroupPeerId(1), true));
        g.remove_peer(GroupPeerId(1));
        // Same key returns under a new peer id.
        g.add_peer(
            GroupPeerId(9),
            PublicKey([1; 32]),
            "ursula".into(),
            GroupRole::User,
            Instant::now(),
        );
        assert!(g.is_ignored(GroupPeerId(9)));
        assert!(g.set_ignore(GroupPeerId(9), false));
        assert!(!g.is_ignored(GroupPeerId(9)));
        assert!(!g.set_ignore(GroupPeerId(77), true));
    }

    #[test]
    fn rename_records_previous_name() {
        let mut g = group_with_peers();
        let old = g.rename_peer(GroupPeerId(1), "sula".into());
        assert_eq!(old.as_deref(), Some("ursula"));
        assert_eq!(g.peer(GroupPeerId(1)).unwrap().prev_name, "ursula");
        // No-op rename reports nothing.
        assert!(g.rename_peer(GroupPeerId(1), "sula".into()).is_none());
    }
}
