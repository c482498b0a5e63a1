//! Legacy conference registry. Conferences are text-or-AV chats whose
//! peer list is pulled wholesale on every membership change; entries
//! are matched by public key against the previous snapshot so audio
//! device assignments survive churn.

use std::time::{Duration, Instant};
use toxide_net::{ConferenceId, ConferenceNumber, ConferencePeerNumber, ConferenceType, PublicKey};

/// Peers discovered during the initial sync are not announced.
pub const JOIN_ANNOUNCE_DEBOUNCE: Duration = Duration::from_secs(10);

/// Device-indexed audio sinks/sources behind open/close/mute
/// primitives; the capture and playback engines live outside the
/// client.
pub trait AudioControl: Send {
    fn open_input(&mut self, device: usize) -> bool;
    fn close_input(&mut self);
    fn open_output(&mut self, device: usize) -> bool;
    fn close_output(&mut self, device: usize);
    fn set_mute(&mut self, device: usize, mute: bool);
}

/// Stand-in used when no audio backend is linked.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioControl for NullAudio {
    fn open_input(&mut self, _device: usize) -> bool {
        false
    }
    fn close_input(&mut self) {}
    fn open_output(&mut self, _device: usize) -> bool {
        false
    }
    fn close_output(&mut self, _device: usize) {}
    fn set_mute(&mut self, _device: usize, _mute: bool) {}
}

#[derive(Debug, Clone)]
pub struct ConferencePeer {
    pub number: ConferencePeerNumber,
    pub pk: PublicKey,
    pub name: String,
    pub sending_audio: bool,
    pub output_device: usize,
    pub muted: bool,
    pub last_audio: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct ConferenceAudio {
    pub enabled: bool,
    pub input_device: usize,
    pub last_sent_audio: Option<Instant>,
    pub push_to_talk: bool,
    pub last_pushed: Option<Instant>,
}

#[derive(Debug)]
pub struct Conference {
    pub number: ConferenceNumber,
    pub id: Option<ConferenceId>,
    pub kind: ConferenceType,
    pub title: String,
    pub started_at: Instant,
    pub peers: Vec<ConferencePeer>,
    /// Sorted names for sidebar display and tab completion.
    pub name_list: Vec<String>,
    pub side_pos: usize,
    pub audio: ConferenceAudio,
}

/// Join/leave lines produced by a peer-list rebuild.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PeerListDelta {
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl Conference {
    pub fn new(number: ConferenceNumber, kind: ConferenceType, now: Instant) -> Self {
        Self {
            number,
            id: None,
            kind,
            title: String::new(),
            started_at: now,
            peers: Vec::new(),
            name_list: Vec::new(),
            side_pos: 0,
            audio: ConferenceAudio::default(),
        }
    }

    fn rebuild_name_list(&mut self) {
        let mut names: Vec<String> = self.peers.iter().map(|p| p.name.clone()).collect();
        names.sort_by_key(|n| n.to_lowercase());
        self.name_list = names;
    }

    /// Replaces the peer table with `new`, carrying per-peer state
    /// over by public key. Returns the join/leave announcements; joins
    /// within the initial-sync debounce window are suppressed.
    pub fn update_peers(
        &mut self,
        new: Vec<(ConferencePeerNumber, PublicKey, String)>,
        now: Instant,
    ) -> PeerListDelta {
        let old = std::mem::take(&mut self.peers);
        let announce = now.duration_since(self.started_at) > JOIN_ANNOUNCE_DEBOUNCE;
        let mut delta = PeerListDelta::default();

        for (number, pk, name) in new {
            match old.iter().find(|p| p.pk == pk) {
                Some(prev) => {
                    let mut peer = prev.clone();
                    peer.number = number;
                    peer.name = name;
                    self.peers.push(peer);
                }
                None => {
                    if announce && !name.is_empty() {
                        delta.joined.push(name.clone());
                    }
                    self.peers.push(ConferencePeer {
                        number,
                        pk,
                        name,
                        sending_audio: false,
                        output_device: 0,
                        muted: false,
                        last_audio: None,
                    });
                }
            }
        }

        for prev in &old {
            if !self.peers.iter().any(|p| p.pk == prev.pk) && !prev.name.is_empty() {
                delta.left.push(prev.name.clone());
            }
        }

        self.rebuild_name_list();
        delta
    }

    pub fn set_peer_name(&mut self, number: ConferencePeerNumber, name: String) {
        if let Some(peer) = self.peers.iter_mut().find(|p| p.number == number) {
            peer.name = name;
        }
        self.rebuild_name_list();
    }

    pub fn peer_by_number(&self, number: ConferencePeerNumber) -> Option<&ConferencePeer> {
        self.peers.iter().find(|p| p.number == number)
    }
}

#[derive(Debug, Default)]
pub struct ConferenceRegistry {
    list: Vec<Option<Conference>>,
    max_idx: usize,
    index: Vec<usize>,
}

impl ConferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_active(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn get(&self, number: ConferenceNumber) -> Option<&Conference> {
        self.list.get(number.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, number: ConferenceNumber) -> Option<&mut Conference> {
        self.list.get_mut(number.0 as usize)?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conference> {
        self.list[..self.max_idx].iter().flatten()
    }

    pub fn add(&mut self, conference: Conference) -> &mut Conference {
        let slot = conference.number.0 as usize;
        if slot >= self.list.len() {
            self.list.resize_with(slot + 1, || None);
        }
        self.list[slot] = Some(conference);
        if slot + 1 > self.max_idx {
            self.max_idx = slot + 1;
        }
        self.sort();
        self.list[slot].as_mut().unwrap()
    }

    pub fn remove(&mut self, number: ConferenceNumber) -> Option<Conference> {
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
            let c = self.list[i].as_ref().unwrap();
            (c.title.to_lowercase(), c.number.0)
        });
        self.index = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: u32, pk: u8, name: &str) -> (ConferencePeerNumber, PublicKey, String) {
        (ConferencePeerNumber(n), PublicKey([pk; 32]), name.to_owned())
    }

    #[test]
    fn initial_sync_is_not_announced() {
        let now = Instant::now();
        let mut conf = Conference::new(ConferenceNumber(0), ConferenceType::Text, now);
        let delta = conf.update_peers(vec![peer(0, 1, "alice"), peer(1, 2, "bob")], now);
        assert_eq!(delta, PeerListDelta::default());
        assert_eq!(conf.name_list, vec!["alice", "bob"]);
    }

    #[test]
    fn later_changes_announce_joins_and_leaves() {
        let start = Instant::now();
        let mut conf = Conference::new(ConferenceNumber(0), ConferenceType::Text, start);
        conf.update_peers(vec![peer(0, 1, "alice")], start);

        let later = start + JOIN_ANNOUNCE_DEBOUNCE + Duration::from_secs(1);
        let delta = conf.update_peers(vec![peer(0, 1, "alice"), peer(1, 2, "bob")], later);
        assert_eq!(delta.joined, vec!["bob"]);
        assert!(delta.left.is_empty());

        let delta = conf.update_peers(vec![peer(0, 2, "bob")], later);
        assert!(delta.joined.is_empty());
        assert_eq!(delta.left, vec!["alice"]);
    }

    #[test]
    fn audio_state_survives_renumbering() {
        let start = Instant::now();
        let mut conf = Conference::new(ConferenceNumber(0), ConferenceType::Av, start);
        conf.update_peers(vec![peer(0, 1, "alice"), peer(1, 2, "bob")], start);
        conf.peers[1].output_device = 3;
        conf.peers[1].muted = true;

        // Alice leaves; bob is renumbered to 0 but keeps his device.
        conf.update_peers(vec![peer(0, 2, "bob")], start);
        let bob = conf.peer_by_number(ConferencePeerNumber(0)).unwrap();
        assert_eq!(bob.output_device, 3);
        assert!(bob.muted);
    }

    #[test]
    fn registry_sparse_slots() {
        let now = Instant::now();
        let mut reg = ConferenceRegistry::new();
        reg.add(Conference::new(ConferenceNumber(0), ConferenceType::Text, now));
        reg.add(Conference::new(ConferenceNumber(2), ConferenceType::Text, now));
        assert_eq!(reg.num_active(), 2);
        reg.remove(ConferenceNumber(2));
        assert_eq!(reg.num_active(), 1);
        assert!(reg.get(ConferenceNumber(2)).is_none());
    }
}
