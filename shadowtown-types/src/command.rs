use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::event::VoteChoice;
use crate::ids::PlayerSeat;
use crate::ids::RoomId;

/// A client-originated message, already parsed out of the transport layer's
/// JSON framing (spec.md §4.2, §6). The transport layer maps its raw frame
/// to one of these; everything downstream of this boundary is this crate's
/// concern.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum ClientCommand {
    Create {
        title: Arc<str>,
        password: Option<Arc<str>>,
    },
    Enter {
        room: RoomId,
    },
    Leave,
    /// Free text or a slash command; the dispatcher classifies it
    /// (spec.md §4.2).
    Message {
        text: Arc<str>,
    },
    Setup {
        title: Arc<str>,
        formation: Vec<Arc<str>>,
        constraints: HashMap<Arc<str>, HashMap<Arc<str>, Arc<str>>>,
        exclusion: HashMap<Arc<str>, Vec<Arc<str>>>,
    },
}

/// Slash commands recognized inside a `Message` during an active match
/// (spec.md §6 "Slash-command surface").
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum SlashCommand {
    Begin,
    Pm { to: PlayerSeat, text: Arc<str> },
    Court,
    Lynch,
    MayorReveal,
    Vote { target: Option<PlayerSeat> },
    Guilty,
    Innocent,
    Abstention,
    Skip,
    Visit { primary: PlayerSeat, secondary: Option<PlayerSeat> },
    Act,
    Recruit { target: PlayerSeat },
    Jail { target: PlayerSeat },
    Suicide,
    Nickname { name: Arc<str> },
}

impl From<VoteChoice> for SlashCommand {
    fn from(choice: VoteChoice) -> Self {
        match choice {
            VoteChoice::Guilty => SlashCommand::Guilty,
            VoteChoice::Innocent => SlashCommand::Innocent,
            VoteChoice::Abstention => SlashCommand::Abstention,
        }
    }
}
