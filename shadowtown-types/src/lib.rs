//! Data shared between the room engine and any transport layer that embeds it.
//!
//! Nothing in this crate talks to a socket; it exists so `shadowtown-engine`
//! and a future transport crate can agree on wire-shaped types without the
//! engine depending on a serialization format beyond `serde`.

mod command;
mod event;
mod ids;
mod phase;
mod role;

pub use command::ClientCommand;
pub use command::SlashCommand;
pub use event::Event;
pub use event::EventPayload;
pub use event::VoteChoice;
pub use ids::PlayerSeat;
pub use ids::RoomId;
pub use ids::SessionId;
pub use ids::SessionToken;
pub use phase::Phase;
pub use role::Alignment;
pub use role::OffenseLevel;
pub use role::RoleId;
pub use role::Team;
