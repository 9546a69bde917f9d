// Text-adventure console: command parsing, navigation state, backend client.

pub mod client;
pub mod command;
pub mod session;
pub mod state;
pub mod text;

pub use client::{ClientError, DungeonApi, HttpDungeonApi};
pub use command::{CommandLine, Verb};
pub use session::Session;
pub use state::{NavigationState, Phase};
