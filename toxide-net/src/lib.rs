//! Network-layer facade for toxide.
//!
//! The client never talks to the transport directly: it holds a
//! `Box<dyn Netlink>` and consumes the callback stream returned by
//! [`Netlink::poll`]. The real DHT/onion transport is out of scope for
//! this workspace; [`sim::SimNetlink`] provides a local-state backend
//! for development and tests.

pub mod netlink;
pub mod sim;
pub mod types;

pub use netlink::{
    ConferenceError, FileSendError, FriendAddError, GroupError, NetEvent, Netlink, SendError,
};
pub use types::*;
