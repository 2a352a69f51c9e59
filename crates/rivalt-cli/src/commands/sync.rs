use clap::Args;
use rivalt_core::{SyncCommand, SyncMessage};

use super::{CliResult, Session};

#[derive(Args)]
pub struct SyncArgs {
    /// JSON message, e.g. '{"command": "start", "sync": 12}'
    message: String,

    /// Treat the message as a local command and print the message to send
    /// to the paired device instead of the resulting events
    #[arg(long)]
    outgoing: bool,
}

pub fn run(args: SyncArgs) -> CliResult {
    let mut session = Session::open()?;

    if args.outgoing {
        let command: SyncCommand = serde_json::from_str(&args.message)?;
        session.model.apply_sync(&SyncMessage::new(command));
        let message = SyncMessage::outgoing(command, &session.model);
        println!("{}", serde_json::to_string(&message)?);
        session.model.poll_events();
    } else {
        let message: SyncMessage = serde_json::from_str(&args.message)?;
        session.model.apply_sync(&message);
        session.report()?;
    }

    session.save()
}
