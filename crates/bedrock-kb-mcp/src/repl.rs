//! Interactive console for the bedrock-kb MCP server.
//!
//! Launch with `bedrock-kb-mcp repl`. Plain lines are sent as queries to
//! `query_strands_docs`; lines starting with `/` are console commands.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::json;
use tokio::runtime::Handle;

use crate::tools::query_strands_docs::TOOL_NAME;
use crate::tools::ToolRegistry;
use crate::types::InitializeResult;

const HISTORY_FILE: &str = ".bedrock_kb_mcp_history";

const COMMANDS: &[(&str, &str)] = &[
    ("/info", "Show server capabilities and tools"),
    ("/tools", "List available MCP tools"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the console"),
];

/// One line of console input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput<'a> {
    Empty,
    Command(&'a str),
    Query(&'a str),
}

pub fn parse_line(line: &str) -> ReplInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    match line.strip_prefix('/') {
        Some(cmd) => ReplInput::Command(cmd.split_whitespace().next().unwrap_or("help")),
        None => ReplInput::Query(line),
    }
}

#[derive(Default)]
struct DocsHelper;

impl Completer for DocsHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        if !input.starts_with('/') || input.contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let matches = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, desc)| Pair {
                display: format!("{cmd:<10} {desc}"),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for DocsHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(cmd, _)| cmd.starts_with(line) && *cmd != line)
            .map(|(cmd, _)| cmd[line.len()..].to_string())
    }
}

impl Highlighter for DocsHelper {}
impl Validator for DocsHelper {}
impl Helper for DocsHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the console. Blocks the calling thread; tool calls are driven on
/// `runtime`, so this must not be called from inside an async task without
/// `tokio::task::block_in_place`.
pub fn run(tools: ToolRegistry, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mbedrock-kb-mcp v{}\x1b[0m \x1b[90mStrands Agents documentation\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Type a question to query the docs, \x1b[36m/help\x1b[0m for commands, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<DocsHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(DocsHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(HISTORY_FILE);
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mdocs>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => match parse_line(&line) {
                ReplInput::Empty => continue,
                ReplInput::Query(query) => cmd_query(&tools, &runtime, query),
                ReplInput::Command("exit" | "quit") => {
                    eprintln!("  Goodbye!");
                    break;
                }
                ReplInput::Command("help" | "h" | "?") => cmd_help(),
                ReplInput::Command("clear" | "cls") => eprint!("\x1b[2J\x1b[H"),
                ReplInput::Command("info") => cmd_info(&tools),
                ReplInput::Command("tools") => cmd_tools(&tools),
                ReplInput::Command(other) => {
                    eprintln!("  Unknown command '/{other}'. Type /help for commands.");
                }
            },
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_query(tools: &ToolRegistry, runtime: &Handle, query: &str) {
    let call = tools.call(TOOL_NAME, Some(json!({ "query": query })));
    match runtime.block_on(call) {
        Ok(result) => {
            println!();
            println!("{}", result.joined_text());
            println!();
        }
        Err(e) => eprintln!("  Error: {e}"),
    }
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<10} {desc}");
    }
    eprintln!();
    eprintln!("  Anything else is sent to {TOOL_NAME}.");
    eprintln!();
}

fn cmd_info(tools: &ToolRegistry) {
    let info = InitializeResult::default_result();
    eprintln!();
    eprintln!(
        "  Server:   {} v{}",
        info.server_info.name, info.server_info.version
    );
    eprintln!("  Protocol: {}", info.protocol_version);
    eprintln!("  Tools:    {}", tools.len());
    eprintln!();
}

fn cmd_tools(tools: &ToolRegistry) {
    let defs = tools.list_tools();
    eprintln!();
    eprintln!("  {} MCP tool(s) available:", defs.len());
    eprintln!();
    for tool in &defs {
        eprintln!(
            "    {:<22} {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }
    eprintln!();
}
