//! toolbridge command-line entry point
//!
//! Three modes over one pipeline: `compile` prints the tool set derived
//! from an API specification, `chat` runs an interactive slot-filling
//! session in the terminal, and `serve` exposes the same engine over REST.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use embeddings::{EmbeddingConfig, InMemoryVectorStore, OpenAiEmbeddings};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use toolbridge_dialogue::{InMemoryConversationStore, SlotFillingEngine, TurnState};
use toolbridge_exec::ReqwestTransport;
use toolbridge_match::{MatchEngine, ToolIndex};
use toolbridge_spec::{SpecCompiler, ToolDescriptor};
use tracing::{info, warn, Level};

/// Environment variable holding the key for the embedding backend
const EMBEDDING_KEY_VAR: &str = "OPENAI_API_KEY";

/// toolbridge: talk to any REST API described by an OpenAPI document
#[derive(Parser, Debug)]
#[command(name = "toolbridge")]
#[command(version)]
#[command(about = "Compile API specifications into conversational tools", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a specification and print the resulting tool set
    Compile {
        /// Path to an OpenAPI 3.x or Swagger 2.0 document (JSON or YAML)
        spec: PathBuf,

        /// Print full descriptors as JSON instead of a summary table
        #[arg(long)]
        json: bool,
    },
    /// Interactive chat session against the compiled tools
    Chat {
        /// Path to an OpenAPI 3.x or Swagger 2.0 document (JSON or YAML)
        spec: PathBuf,

        /// HTTP timeout in seconds for executed calls
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Run the REST API server
    Serve {
        /// Path to an OpenAPI 3.x or Swagger 2.0 document (JSON or YAML)
        spec: PathBuf,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// HTTP timeout in seconds for executed calls
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    match args.command {
        Command::Compile { spec, json } => compile(&spec, json),
        Command::Chat { spec, timeout } => chat(&spec, timeout).await,
        Command::Serve {
            spec,
            host,
            port,
            timeout,
        } => serve(&spec, &host, port, timeout).await,
    }
}

/// Load and compile a specification document from disk
fn load_tools(path: &Path) -> Result<Vec<ToolDescriptor>> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("reading specification {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let tools = if is_yaml {
        SpecCompiler::from_yaml_str(&input)
    } else {
        SpecCompiler::from_json_str(&input)
    }
    .with_context(|| format!("parsing specification {}", path.display()))?;

    info!(count = tools.len(), "compiled tool set");
    Ok(tools)
}

/// Build the matcher, attaching the embedding backend when a key is set
async fn build_matcher(tools: Vec<ToolDescriptor>) -> (Arc<MatchEngine>, Arc<ToolIndex>) {
    let index = Arc::new(ToolIndex::build(tools));

    let engine = match EmbeddingConfig::from_env(
        EMBEDDING_KEY_VAR,
        "https://api.openai.com/v1",
        "text-embedding-3-small",
        1536,
    ) {
        Ok(config) => match OpenAiEmbeddings::new(config) {
            Ok(provider) => {
                let store = Arc::new(InMemoryVectorStore::new(1536));
                MatchEngine::new(index.clone()).with_semantic(Arc::new(provider), store)
            }
            Err(e) => {
                warn!("Embedding client unavailable: {}. Matching without semantic signal.", e);
                MatchEngine::new(index.clone())
            }
        },
        Err(_) => {
            info!(
                "{} not set; matching without semantic signal",
                EMBEDDING_KEY_VAR
            );
            MatchEngine::new(index.clone())
        }
    };

    if let Err(e) = engine.index_embeddings().await {
        warn!("Embedding indexing failed: {}. Falling back to neutral semantic scores.", e);
    }

    (Arc::new(engine), index)
}

/// Wire a full dialogue engine over the compiled tools
async fn build_engine(
    tools: Vec<ToolDescriptor>,
    timeout: u64,
) -> Result<(
    Arc<SlotFillingEngine>,
    Arc<ToolIndex>,
    Arc<InMemoryConversationStore>,
)> {
    let (matcher, index) = build_matcher(tools).await;
    let transport = Arc::new(
        ReqwestTransport::new(Duration::from_secs(timeout)).context("building HTTP client")?,
    );
    let store = Arc::new(InMemoryConversationStore::new());
    let engine = Arc::new(SlotFillingEngine::new(matcher, transport, store.clone()));
    Ok((engine, index, store))
}

fn compile(spec: &Path, json: bool) -> Result<()> {
    let tools = load_tools(spec)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    for tool in &tools {
        println!(
            "{:7} {:40} {}",
            tool.endpoint.method.to_string(),
            tool.endpoint.path,
            tool.name
        );
        if !tool.description.is_empty() {
            println!("        {}", tool.description);
        }
        let required = &tool.input_schema.required;
        if !required.is_empty() {
            println!("        required: {}", required.join(", "));
        }
    }
    println!("\n{} tools compiled", tools.len());
    Ok(())
}

async fn chat(spec: &Path, timeout: u64) -> Result<()> {
    let tools = load_tools(spec)?;
    let (engine, index, _store) = build_engine(tools, timeout).await?;
    let conversation_id = uuid::Uuid::new_v4().to_string();

    println!(
        "{} tools loaded. Describe what you want to do, or press Ctrl-D to quit.",
        index.len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let response = engine.handle_turn(&conversation_id, &line).await?;
        if response.state == TurnState::Executed {
            if let Some(body) = response.execution.as_ref().and_then(|e| e.body.as_ref()) {
                println!(
                    "Executed {} (HTTP {})",
                    response.tool.as_deref().unwrap_or_default(),
                    response
                        .execution
                        .as_ref()
                        .and_then(|e| e.status_code)
                        .unwrap_or_default()
                );
                println!("{}", serde_json::to_string_pretty(body)?);
            } else {
                println!("{}", response.reply);
            }
        } else {
            println!("{}", response.reply);
        }

        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    println!("bye");
    Ok(())
}

async fn serve(spec: &Path, host: &str, port: u16, timeout: u64) -> Result<()> {
    let tools = load_tools(spec)?;
    let (engine, index, store) = build_engine(tools, timeout).await?;

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;

    toolbridge_server::serve(addr, engine, index, store)
        .await
        .context("running server")?;
    Ok(())
}
