//! Relays agent output as decoded events.
//!
//! Replays a recorded `stream-json` log (`--input`) or runs a live prompt
//! (`--prompt`), and writes the decoded events to stdout as SSE frames,
//! JSON lines, or human-readable status hints.

use investigation_stream::{
    hint_from_chunk, AgentConfig, AgentSession, Error, FileSessionStore, ParsedChunk, SseWriter,
    StreamInterpreter, ToolPolicy,
};
use serde_json::Value;
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USAGE: &str = "\
Usage: chunk-relay (--input <file|-> | --prompt <text>) [options]

Options:
  -i, --input <file|->      Replay a recorded stream-json log ('-' for stdin)
  -p, --prompt <text>       Run the agent live with this prompt
  -f, --format <fmt>        Output format: sse (default), json, hints
      --model <name>        Model override for live runs
      --system-prompt <t>   System prompt for live runs
      --mcp-config <file>   MCP server configuration for live runs
      --allow <a,b,..>      Tools the agent may call
      --deny <a,b,..>       Tools the agent must not call
      --store <file>        Session store used to resume threads
      --thread <id>         Conversation thread (requires --store)
      --resource <id>       Resource owning the thread (default: default)
  -h, --help                Show this help

Logging is controlled with RUST_LOG.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Sse,
    Json,
    Hints,
}

struct Config {
    input: Option<PathBuf>,
    prompt: Option<String>,
    format: Format,
    model: Option<String>,
    system_prompt: Option<String>,
    mcp_config: Option<PathBuf>,
    allowed: Vec<String>,
    denied: Vec<String>,
    store: Option<PathBuf>,
    thread: Option<String>,
    resource: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            prompt: None,
            format: Format::Sse,
            model: None,
            system_prompt: None,
            mcp_config: None,
            allowed: Vec::new(),
            denied: Vec::new(),
            store: None,
            thread: None,
            resource: "default".to_string(),
        }
    }
}

enum Command {
    Help,
    Run(Config),
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut config = Config::default();
    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--help" || flag == "-h" {
            return Ok(Command::Help);
        }
        i += 1;
        let value = args
            .get(i)
            .cloned()
            .ok_or_else(|| format!("{flag} requires a value"));
        match flag {
            "--input" | "-i" => config.input = Some(PathBuf::from(value?)),
            "--prompt" | "-p" => config.prompt = Some(value?),
            "--format" | "-f" => {
                config.format = match value?.as_str() {
                    "sse" => Format::Sse,
                    "json" => Format::Json,
                    "hints" => Format::Hints,
                    other => return Err(format!("unknown format: {other}")),
                };
            }
            "--model" => config.model = Some(value?),
            "--system-prompt" => config.system_prompt = Some(value?),
            "--mcp-config" => config.mcp_config = Some(PathBuf::from(value?)),
            "--allow" => config.allowed.extend(split_list(&value?)),
            "--deny" => config.denied.extend(split_list(&value?)),
            "--store" => config.store = Some(PathBuf::from(value?)),
            "--thread" => config.thread = Some(value?),
            "--resource" => config.resource = value?,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }
    match (&config.input, &config.prompt) {
        (None, None) => Err("one of --input or --prompt is required".to_string()),
        (Some(_), Some(_)) => Err("--input and --prompt cannot be combined".to_string()),
        _ if config.thread.is_some() && config.store.is_none() => {
            Err("--thread requires --store".to_string())
        }
        _ => Ok(Command::Run(config)),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

enum Emitter<W: Write> {
    Sse(SseWriter<W>),
    Lines { out: W, format: Format },
}

impl<W: Write> Emitter<W> {
    fn new(out: W, format: Format) -> Self {
        match format {
            Format::Sse => Self::Sse(SseWriter::new(out)),
            Format::Json | Format::Hints => Self::Lines { out, format },
        }
    }

    fn emit(&mut self, chunk: &ParsedChunk) -> investigation_stream::Result<()> {
        match self {
            Self::Sse(writer) => writer.send(chunk),
            Self::Lines { out, format } => {
                let line = if *format == Format::Json {
                    Some(serde_json::to_string(chunk).map_err(|source| Error::Json {
                        context: "encoding event".to_string(),
                        source,
                    })?)
                } else {
                    hint_line(chunk)
                };
                match line {
                    Some(line) => writeln!(out, "{line}").map_err(|source| Error::Io {
                        context: "writing to stdout".to_string(),
                        source,
                    }),
                    None => Ok(()),
                }
            }
        }
    }
}

fn hint_line(chunk: &ParsedChunk) -> Option<String> {
    if let ParsedChunk::Text(text) = chunk {
        return Some(text.content.clone());
    }
    hint_from_chunk(chunk).map(|hint| format!("[{hint}]"))
}

fn replay<W: Write>(input: &Path, emitter: &mut Emitter<W>) -> investigation_stream::Result<()> {
    let mut reader: Box<dyn BufRead> = if input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(input).map_err(|source| Error::Io {
            context: format!("opening {}", input.display()),
            source,
        })?;
        Box::new(BufReader::new(file))
    };
    let mut interpreter = StreamInterpreter::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).map_err(|source| Error::Io {
            context: format!("reading {}", input.display()),
            source,
        })?;
        if read == 0 {
            break;
        }
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(raw) = serde_json::from_slice::<Value>(trimmed) else {
            log::debug!("skipping non-JSON line: {}", String::from_utf8_lossy(trimmed));
            continue;
        };
        for chunk in interpreter.interpret_all(&raw) {
            emitter.emit(&chunk)?;
        }
    }
    Ok(())
}

fn run_live<W: Write>(
    config: &Config,
    prompt: &str,
    emitter: &mut Emitter<W>,
) -> investigation_stream::Result<()> {
    let mut policy = ToolPolicy::new();
    policy.allowed.clone_from(&config.allowed);
    policy.denied.clone_from(&config.denied);
    let mut agent = AgentConfig::new().with_tool_policy(policy);
    if let Some(ref model) = config.model {
        agent = agent.with_model(model);
    }
    if let Some(ref system_prompt) = config.system_prompt {
        agent = agent.with_system_prompt(system_prompt);
    }
    if let Some(ref path) = config.mcp_config {
        agent = agent.with_mcp_config(path.clone());
    }
    let mut session = match (&config.store, &config.thread) {
        (Some(path), Some(thread)) => AgentSession::spawn_for_thread(
            agent,
            prompt,
            Arc::new(FileSessionStore::new(path)),
            thread,
            &config.resource,
        )?,
        _ => AgentSession::spawn(agent, prompt)?,
    };
    for chunk in session.events()? {
        emitter.emit(&chunk)?;
    }
    Ok(())
}

fn main() {
    pretty_env_logger::init();
    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };
    let mut emitter = Emitter::new(io::stdout().lock(), config.format);
    let result = match (&config.input, &config.prompt) {
        (Some(input), _) => replay(input, &mut emitter),
        (None, Some(prompt)) => run_live(&config, prompt, &mut emitter),
        (None, None) => Ok(()),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
