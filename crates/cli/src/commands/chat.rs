//! `parley chat`: one query through the same dispatch path the gateway uses.

use parley_core::job::{ChatJob, ChatMode};
use parley_core::sink::SinkEvent;
use parley_dispatch::{JobOutcome, Ticket};
use parley_gateway::Runtime;
use std::io::Write;
use std::path::Path;

pub struct ChatArgs {
    pub query: String,
    pub mode: String,
    pub model: Option<String>,
    pub session: String,
    pub user: String,
}

pub async fn run(config_path: Option<&Path>, args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let runtime = Runtime::from_config(&config).await?;

    let job = ChatJob {
        username: args.user,
        session_id: args.session,
        query: args.query,
        model: args.model.unwrap_or_else(|| config.default_model.clone()),
        mode: ChatMode::from(args.mode),
    };

    let Ticket {
        mut events,
        completion,
        ..
    } = runtime.dispatcher.submit(job).await?;

    let mut stdout = std::io::stdout();
    let mut reported = None;
    while let Some(event) = events.recv().await {
        match event {
            SinkEvent::Result { content } => {
                write!(stdout, "{content}")?;
                stdout.flush()?;
            }
            SinkEvent::Error { message } => {
                eprintln!("\nerror: {message}");
                reported = Some(message);
            }
        }
    }
    writeln!(stdout)?;

    let outcome = completion.wait().await;
    runtime.shutdown().await;

    match (outcome, reported) {
        (JobOutcome::Completed(_), None) => Ok(()),
        (JobOutcome::Failed(message), None) => {
            eprintln!("error: {message}");
            Err(message.into())
        }
        (_, Some(message)) => Err(message.into()),
        (JobOutcome::Disconnected, None) => Err("output stream closed early".into()),
    }
}
