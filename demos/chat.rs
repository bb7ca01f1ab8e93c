//! Interactive ticketing chat over the Unizo MCP server.
//!
//! Usage:
//!   UNIZO_API_KEY=... OPENAI_API_KEY=sk-... cargo run --example chat
//!   UNIZO_API_KEY=... OPENAI_API_KEY=sk-... cargo run --example chat -- --model gpt-4o-mini
//!   UNIZO_API_KEY=... cargo run --example chat -- --list-tools
//!   cargo run --example chat -- --server-url http://localhost:8080/sse --openai-base-url http://localhost:8000
//!
//! Ctrl-C or type "exit" / "quit" to leave.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use unizo_sdk::adapters::openai::DEFAULT_MODEL;
use unizo_sdk::{OpenAiProvider, ToolSetConfig, UnizoOpenAIToolSet, UnizoToolSet};

#[derive(Parser)]
#[command(name = "chat", about = "Chat with the Unizo ticketing tools through OpenAI")]
struct Cli {
    /// Model to use
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Unizo MCP server URL (defaults to UNIZO_SERVER_URL or the hosted server)
    #[arg(long)]
    server_url: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, default_value = "https://api.openai.com")]
    openai_base_url: String,

    /// Print the available tool schemas and exit
    #[arg(long)]
    list_tools: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = ToolSetConfig::from_env().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    if let Some(ref url) = cli.server_url {
        config = config.with_server_url(url);
    }
    let toolset = match UnizoToolSet::with_config(config) {
        Ok(ts) => Arc::new(ts),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = toolset.connect().await {
        eprintln!("error: failed to connect: {e}");
        std::process::exit(1);
    }

    if cli.list_tools {
        match toolset.get_tools(None).await {
            Ok(tools) => {
                for tool in tools {
                    println!("{}: {}", tool.name, tool.description);
                    println!("  {}", tool.parameters.to_value());
                }
            }
            Err(e) => eprintln!("\x1b[1;31merror:\x1b[0m {e}"),
        }
        toolset.cleanup().await.ok();
        return;
    }

    let openai_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!("error: OPENAI_API_KEY not set");
        std::process::exit(1);
    });
    let provider = OpenAiProvider::new(openai_key).with_base_url(&cli.openai_base_url);
    let agent = UnizoOpenAIToolSet::with_provider(Arc::clone(&toolset), provider);

    eprintln!("unizo-sdk chat");
    eprintln!("server: {}", toolset.server_url());
    eprintln!("model: {}", cli.model);
    eprintln!("---");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut history = Vec::new();

    loop {
        eprint!("\x1b[1;36myou>\x1b[0m ");
        io::stderr().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "exit" | "quit" | "/q") {
            break;
        }

        match agent.process_query(trimmed, &history, &cli.model).await {
            Ok((text, messages)) => {
                eprint!("\x1b[1;32magent>\x1b[0m ");
                println!("{text}");
                history = messages;
            }
            Err(e) => eprintln!("\x1b[1;31merror:\x1b[0m {e}"),
        }
    }

    toolset.cleanup().await.ok();
    eprintln!("bye.");
}
