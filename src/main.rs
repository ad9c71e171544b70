use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use chatflow::engine::FlowEngine;
use chatflow::flow::Flow;
use chatflow::flow::store::FileFlowStore;
use chatflow::logger::init_tracing;
use chatflow::message::TurnRequest;
use chatflow::{Settings, store};

#[derive(Parser)]
#[command(name = "chatflow", about = "Conversational flow engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive a flow interactively from the terminal.
    Run {
        /// Flow id to run (defaults to the configured flow).
        #[arg(long)]
        flow: Option<String>,
    },
    /// Parse and validate a flow definition file.
    Validate {
        /// Path to a flow JSON file.
        file: PathBuf,
    },
    /// Print the JSON Schema for flow definition files.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let cli = Cli::parse();

    match cli.command {
        Command::Run { flow } => run_console(flow).await,
        Command::Validate { file } => validate(&file),
        Command::Schema => {
            let schema = schemars::schema_for!(Flow);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn validate(file: &PathBuf) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let flow = Flow::from_json(&contents)
        .with_context(|| format!("validating {}", file.display()))?;

    let dangling = flow.dangling_references();
    println!("flow `{}`: {} steps, ok", flow.id(), flow.steps().len());
    for (step, target) in &dangling {
        println!("  warning: step `{step}` references missing step `{target}`");
    }
    Ok(())
}

async fn run_console(flow_override: Option<String>) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let flow_id = flow_override.unwrap_or_else(|| settings.default_flow_id.clone());

    let flows = Arc::new(FileFlowStore::new(&settings.flows_dir));
    let state_store = store::connect(&settings).await;
    let engine = FlowEngine::new(flows, state_store)
        .with_template_mode(settings.template_mode)
        .with_step_cap(settings.max_steps_per_turn);

    let conversation_id = format!("console:{}", uuid::Uuid::new_v4());
    info!("starting flow `{flow_id}` as {conversation_id}");
    println!("(escribe 'salir' para terminar, '/reset' para reiniciar)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    // First turn with no input renders the flow's opening messages.
    let mut pending: Option<String> = None;
    loop {
        let mut request = TurnRequest::new(&conversation_id, &flow_id);
        if let Some(text) = pending.take() {
            request = request.with_input(text);
        }
        let reply = engine.run(request).await?;
        for message in &reply.messages {
            stdout.write_all(format!("🤖 {message}\n").as_bytes()).await?;
        }
        stdout.flush().await?;
        if reply.handoff {
            println!("(conversación finalizada)");
            break;
        }

        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim().to_string();
        match line.as_str() {
            "salir" => break,
            "/reset" => {
                engine.reset(&conversation_id).await;
                println!("(conversación reiniciada)\n");
            }
            _ => pending = Some(line),
        }
    }
    Ok(())
}
