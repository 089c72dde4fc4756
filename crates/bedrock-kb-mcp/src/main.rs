//! bedrock-kb MCP Server entry point.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use bedrock_kb::BedrockAgentClient;
use bedrock_kb_mcp::config::{ConfigOverrides, ServerConfig};
use bedrock_kb_mcp::protocol::ProtocolHandler;
use bedrock_kb_mcp::tools::ToolRegistry;
use bedrock_kb_mcp::transport::StdioTransport;
use bedrock_kb_mcp::types::{InitializeResult, SUPPORTED_PROTOCOL_VERSIONS};

#[derive(Parser)]
#[command(
    name = "bedrock-kb-mcp",
    about = "MCP server for the Strands Agents documentation knowledge base",
    version
)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct BackendArgs {
    /// Knowledge base id. Also reads BEDROCK_KB_ID.
    #[arg(long, global = true)]
    knowledge_base_id: Option<String>,

    /// Generation model ARN. Also reads BEDROCK_MODEL_ARN.
    #[arg(long, global = true)]
    model_arn: Option<String>,

    /// AWS region. Also reads AWS_REGION.
    #[arg(long, global = true)]
    region: Option<String>,

    /// Agent runtime endpoint override. Also reads BEDROCK_KB_ENDPOINT.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Seconds to let in-flight queries finish after stdin closes.
    #[arg(long, global = true)]
    shutdown_grace_secs: Option<u64>,
}

impl From<BackendArgs> for ConfigOverrides {
    fn from(args: BackendArgs) -> Self {
        Self {
            knowledge_base_id: args.knowledge_base_id,
            model_arn: args.model_arn,
            region: args.region,
            endpoint: args.endpoint,
            shutdown_grace_secs: args.shutdown_grace_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   bedrock-kb-mcp completions bash > ~/.local/share/bash-completion/completions/bedrock-kb-mcp
    ///   bedrock-kb-mcp completions zsh > ~/.zfunc/_bedrock-kb-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch the interactive query console.
    Repl,
}

/// Bound on waiting for blocking stdio work (a write to a stalled stdout)
/// once the server has finished.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

fn build_tools(config: &ServerConfig) -> ToolRegistry {
    let client = BedrockAgentClient::from_env(config.endpoint.clone());
    ToolRegistry::standard(Arc::new(client), config.retrieval_target())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::resolve(cli.backend.into());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!("bedrock-kb MCP server v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!(
                "Knowledge base {} via {}",
                config.knowledge_base_id,
                config.endpoint
            );
            let handler = ProtocolHandler::new(build_tools(&config));
            let transport =
                StdioTransport::new(handler).with_shutdown_grace(config.shutdown_grace);
            transport.run().await?;
        }

        Commands::Info => {
            let init = InitializeResult::default_result();
            let tools = build_tools(&config).list_tools();
            let info = serde_json::json!({
                "server": init.server_info,
                "protocol_versions": SUPPORTED_PROTOCOL_VERSIONS,
                "capabilities": init.capabilities,
                "knowledge_base_id": config.knowledge_base_id,
                "model_arn": config.model_arn,
                "endpoint": config.endpoint,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "bedrock-kb-mcp", &mut std::io::stdout());
        }

        Commands::Repl => {
            let tools = build_tools(&config);
            let runtime = tokio::runtime::Handle::current();
            tokio::task::block_in_place(|| bedrock_kb_mcp::repl::run(tools, runtime))?;
        }
    }

    Ok(())
}
