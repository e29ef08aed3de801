//! Line-oriented text protocol for the tally store.
//!
//! Clients send one command per line and receive one reply line per
//! command:
//!
//! ```text
//! SET a 10        ->  a = 10
//! NUMEQUALTO 10   ->  1
//! UNDO            ->  a = None
//! UNDO            ->  NO COMMANDS
//! END             ->  CLEANED
//! ```
//!
//! [`CommandCodec`] plugs the protocol into `tokio_util::codec::Framed`.

pub mod codec;
pub mod command;
pub mod error;
pub mod reply;
pub mod tokenize;

pub use codec::{CommandCodec, Request, DEFAULT_MAX_LINE_LENGTH};
pub use command::Command;
pub use error::{ProtocolError, Result};
pub use reply::Reply;
