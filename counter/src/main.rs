//! Marker counter binary
//!
//! Drives a counter session from stdin and renders every published snapshot.

use anyhow::Context;
use futures::channel::mpsc;
use marker_counter::terminal::{self, Command};
use marker_counter::{CounterConfig, CounterEnvironment, Session, Viewport};
use std::io::Write;
use std::sync::Arc;
use tally_core::environment::SoundPlayer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sound player for a terminal: prints the sound instead of playing it
struct TerminalPop;

impl SoundPlayer for TerminalPop {
    fn play(&self) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "*pop*");
        let _ = stdout.flush();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marker_counter=debug,tally_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CounterConfig::from_env();
    tracing::debug!(?config, "Loaded configuration");

    let env = CounterEnvironment::production(&config, Arc::new(TerminalPop));
    let session = Session::start(&config, env)
        .await
        .context("failed to start counter session")?;

    let (resizes, viewports) = mpsc::unbounded::<Viewport>();
    session.observe_viewport(viewports);

    let renderer = tokio::spawn(render_loop(session.clone()));

    println!("commands: + - r click <id> resize <w> <h> dismiss state quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(terminal::ParseCommandError::Empty) => continue,
            Err(error) => {
                println!("{error}");
                continue;
            },
        };

        match command {
            Command::Increment => {
                session.increment().await?;
            },
            Command::Decrement => {
                session.decrement().await?;
            },
            Command::Reset => {
                session.reset().await?;
            },
            Command::Click(id) => {
                session.remove_marker(id).await?;
            },
            Command::Resize { width, height } => {
                resizes
                    .unbounded_send(Viewport::new(width, height))
                    .context("viewport observer stopped")?;
            },
            Command::Dismiss => {
                session.dismiss_message().await?;
            },
            Command::Dump => {
                let state = session.current_state().await;
                println!("{}", serde_json::to_string_pretty(&*state)?);
            },
            Command::Quit => break,
        }
    }

    drop(resizes);
    session.shutdown().await.context("shutdown did not complete")?;
    renderer.abort();
    Ok(())
}

/// Print each new snapshot and consume the sound trigger it carries
async fn render_loop(session: Session) {
    let mut snapshots = session.subscribe();
    let mut last_frame = String::new();

    loop {
        let state = Arc::clone(&snapshots.borrow_and_update());

        let frame = terminal::render(&state);
        if frame != last_frame {
            print!("{frame}");
            let _ = std::io::stdout().flush();
            last_frame = frame;
        }

        if state.sound_pending && session.consume_sound_trigger().await.is_err() {
            break;
        }

        if snapshots.changed().await.is_err() {
            break;
        }
    }
}
