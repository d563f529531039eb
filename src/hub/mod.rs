//! The coordination hub: live connection state and everything driven by it.
//!
//! - [`presence`]: userId -> live connection handle, source of truth for
//!   "who is reachable right now"
//! - [`rooms`]: group conversation id -> currently-joined connections
//! - [`router`]: resolves an outbound event to one peer or a room fan-out
//! - [`delivery`]: SENT -> DELIVERED -> READ lifecycle and reaction relays
//! - [`calls`]: stateless relay of 1:1 and mesh call signaling
//! - [`status`]: full rebroadcast of the online-user list on presence changes

pub mod calls;
pub mod delivery;
pub mod presence;
pub mod rooms;
pub mod router;
pub mod status;
