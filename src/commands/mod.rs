//! Result structs for command output. Commands return these instead of printing
//! directly; main.rs formats them as human-readable or JSON based on --json.

mod add;
mod alter;
mod release;
mod release_init;
mod remove;
mod status;
mod update;

pub use add::*;
pub use alter::*;
pub use release::*;
pub use release_init::*;
pub use remove::*;
pub use status::*;
pub use update::*;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// `:D`: did what was asked.
    Joy,
    /// `:I`: nothing to do, or done with caveats.
    Meh,
    /// `:(`: refused or failed.
    Sad,
}

impl Mood {
    pub fn face(&self) -> &'static str {
        match self {
            Mood::Joy => ":D",
            Mood::Meh => ":I",
            Mood::Sad => ":(",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Mood::Joy | Mood::Meh => 0,
            Mood::Sad => 1,
        }
    }
}

/// The one-line verdict every mutating command ends with.
#[derive(Debug, Clone, Serialize)]
pub struct ExitMessage {
    pub mood: Mood,
    pub message: String,
}

impl ExitMessage {
    pub fn joy(message: impl Into<String>) -> Self {
        Self {
            mood: Mood::Joy,
            message: message.into(),
        }
    }

    pub fn meh(message: impl Into<String>) -> Self {
        Self {
            mood: Mood::Meh,
            message: message.into(),
        }
    }

    pub fn sad(message: impl Into<String>) -> Self {
        Self {
            mood: Mood::Sad,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.mood.exit_code()
    }
}

pub fn format_exit_human(result: &ExitMessage) -> String {
    format!("{} {}", result.mood.face(), result.message)
}
