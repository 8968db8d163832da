//! The in-room game engine: phase state machine, role/ability catalog,
//! night resolver, voting, private chats, and event emitter.
//!
//! Transport (WebSocket framing, auth, static assets, persistence proper)
//! lives outside this crate; it is the engine's caller.

pub mod archive;
pub mod consts;
pub mod engine;
pub mod error;
pub mod event;
pub mod night;
pub mod player;
pub mod registry;
pub mod room;
pub mod roles;
pub mod session;
pub mod setup;

pub use engine::EngineCommand;
pub use engine::Outbound;
pub use engine::RoomEngine;
pub use error::EngineError;
pub use error::SetupError;
pub use registry::Server;
pub use room::Room;
pub use setup::Setup;
