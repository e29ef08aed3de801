//! Command dispatch.
//!
//! Maps each decoded [`Command`] onto the matching [`Service`] operation and
//! renders the result as a [`Reply`].

use tally_common::Result;
use tally_kv::{Operation, Service};
use tally_protocol::{Command, Reply};
use tally_storage::StorageBackend;

/// Execute `command` against `service`.
///
/// SET and UNSET go through [`Operation`] so they are recorded in history;
/// END wipes the store and starts a fresh history.
pub fn dispatch<S: StorageBackend>(service: &mut Service<S>, command: Command) -> Result<Reply> {
    let reply = match command {
        Command::Set { name, value } => Operation::Set { name, value }.apply(service)?.into(),
        Command::Unset { name } => Operation::Unset { name }.apply(service)?.into(),
        Command::Get { name } => Reply::Value(service.get(&name)?),
        Command::NumEqualTo { value } => Reply::Count(service.count_equal_to(value)?),
        Command::Undo => service.undo()?.into(),
        Command::Redo => service.redo()?.into(),
        Command::End => {
            service.reset()?;
            Reply::Cleaned
        }
    };
    Ok(reply)
}
