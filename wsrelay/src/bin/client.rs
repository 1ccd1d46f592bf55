//! Interactive relay client.
//!
//! Run with: `cargo run --bin wsrelay-client -- --client alice`
//!
//! Lines typed on stdin are sent as `to:<receiverId> <message text>`.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wsrelay_client::{ClientBuilder, ClientError, ClientEvent};
use wsrelay_transport::TransportKind;

/// Message relay client.
#[derive(Parser, Debug)]
#[command(name = "wsrelay-client", version, about = "Message relay client")]
struct Cli {
    /// Identifier to register under. An empty value is rejected.
    #[arg(long, env = "WSRELAY_CLIENT", default_value = "uuid")]
    client: String,

    /// Server URL (`ws://host:port/path`, or `host:port` for tcp).
    #[arg(long, env = "WSRELAY_URL", default_value = "ws://localhost:3030/ws")]
    url: String,

    /// Wire transport: "ws" or "tcp".
    #[arg(long, env = "WSRELAY_TRANSPORT", default_value = "ws")]
    transport: TransportKind,
}

/// Reads stdin on a plain thread so a pending read never holds up exit.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (mut client, mut handle) = ClientBuilder::new(cli.url, cli.client)
        .transport(cli.transport)
        .build();

    let client_task = tokio::spawn(async move { client.run().await });

    let mut lines = stdin_lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.recv(), if stdin_open => {
                match line {
                    Some(line) => match handle.send_line(&line) {
                        Ok(()) => {}
                        Err(ClientError::Input(e)) => println!("{e}"),
                        Err(e) => {
                            tracing::error!("Client stopped: {}", e);
                            break;
                        }
                    },
                    None => stdin_open = false,
                }
            }

            event = handle.next_event() => {
                match event {
                    Some(ClientEvent::Connected) => tracing::info!("Connected"),
                    Some(ClientEvent::Message(m)) => {
                        println!("{} {}: {}", m.display_timestamp(), m.sender, m.text);
                    }
                    Some(ClientEvent::ServerError(m)) => {
                        println!("{} Error from server: {}", m.display_timestamp(), m.text);
                    }
                    Some(ClientEvent::Disconnected) => tracing::info!("Disconnected"),
                    None => break,
                }
            }

            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, ending session");
                handle.disconnect();
                break;
            }
        }
    }

    client_task.await.context("client task panicked")??;
    Ok(())
}
