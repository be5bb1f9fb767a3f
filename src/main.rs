//! Hero Bridge - Entry Point
//!
//! Interactive voice session. Each stdin line is treated as a final speech
//! recognition result; a line starting with `~` is an interim result.
//! Recognized commands go straight to the execution agent, everything else
//! is turned into code by the completion provider and waits for `run`.

use clap::Parser;
use hero_bridge::agent::AgentClient;
use hero_bridge::command::{CommandBridge, Interpreter, SpeechResult, Step};
use hero_bridge::core::error::{BridgeError, Result};
use hero_bridge::core::BridgeConfig;
use hero_bridge::llm::{SynthesisClient, SynthesisRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Voice command bridge for scripted drone flights
#[derive(Parser, Debug)]
#[command(name = "hero-bridge")]
#[command(about = "Turn spoken commands into drone flight actions")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Execution agent base URL (overrides config)
    #[arg(long)]
    agent_url: Option<String>,
}

enum Event {
    Line(String),
    Synthesized { seq: u64, outcome: Result<String> },
    Eof,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hero_bridge=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = BridgeConfig::resolve(args.config.as_deref())?;
    if let Some(url) = args.agent_url {
        config.agent.base_url = Some(url);
    }

    let interpreter = Interpreter::new(&config)?;
    let agent = AgentClient::new(config.agent.base_url());
    tracing::info!("Hero Bridge starting, agent at {}", agent.base_url());

    let synthesizer = match SynthesisClient::from_config(&config.synthesis) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("{} - unrecognized commands cannot generate code", e);
            None
        }
    };

    println!("\n=== HERO BRIDGE ===");
    println!("Say \"{}\" followed by a command.", interpreter.wake_phrase());
    println!();
    println!("Commands:");
    println!("  <text>      - Final speech result");
    println!("  ~<text>     - Interim speech result");
    println!("  run         - Run staged code");
    println!("  show        - Show staged code");
    println!("  quit / q    - Exit");
    println!();

    let mut bridge = CommandBridge::new(interpreter, agent);
    let (tx, mut rx) = mpsc::channel::<Event>(32);

    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stdin_tx.send(Event::Line(line)).await.is_err() {
                return;
            }
        }
        let _ = stdin_tx.send(Event::Eof).await;
    });

    while let Some(event) = rx.recv().await {
        match event {
            Event::Eof => break,
            Event::Synthesized { seq, outcome } => {
                if bridge.finish_synthesis(seq, outcome) || bridge.session().is_current(seq) {
                    show_response(&bridge);
                }
            }
            Event::Line(line) => {
                let input = line.trim();
                match input {
                    "" => continue,
                    "quit" | "q" => break,
                    "show" => match bridge.session().pending_code() {
                        Some(code) => println!("{}", code),
                        None => println!("No code staged."),
                    },
                    "run" => {
                        let _ = bridge.run_staged().await;
                        show_response(&bridge);
                    }
                    _ => {
                        let speech = match input.strip_prefix('~') {
                            Some(interim) => SpeechResult::interim(interim.trim()),
                            None => SpeechResult::final_result(input),
                        };
                        println!("Hearing: {}", speech.text);
                        match bridge.on_speech(speech).await {
                            Ok(Step::Ignored) => {}
                            Ok(Step::Dispatched(_)) => show_response(&bridge),
                            Ok(Step::Synthesize { seq, request }) => {
                                show_response(&bridge);
                                spawn_synthesis(synthesizer.clone(), seq, request, tx.clone());
                            }
                            Err(_) => show_response(&bridge),
                        }
                    }
                }
            }
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

/// Run synthesis off the input loop so speech keeps flowing meanwhile
fn spawn_synthesis(
    synthesizer: Option<Arc<SynthesisClient>>,
    seq: u64,
    request: SynthesisRequest,
    tx: mpsc::Sender<Event>,
) {
    tokio::spawn(async move {
        let outcome = match synthesizer {
            Some(client) => client.complete(&request).await,
            None => Err(BridgeError::SynthesisUnavailable {
                status: 500,
                message: "no completion provider API key set".into(),
            }),
        };
        let _ = tx.send(Event::Synthesized { seq, outcome }).await;
    });
}

fn show_response(bridge: &CommandBridge<AgentClient>) {
    println!("{}", response_line(bridge.session().response()));
}

fn response_line(response: &str) -> String {
    format!("Bridge: {}", response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_line_prefix() {
        assert_eq!(response_line("Circle demo"), "Bridge: Circle demo");
    }
}
