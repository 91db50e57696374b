//! `vikingfs` — a thin HTTP client over the daemon's `/api/v1` surface.
//! Talks JSON over HTTP/1.1; exit codes follow the server contract (spec
//! §7): 0 success, 1 server-reported error, 2 CLI config error, 3
//! connection error.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "vikingfs", version, about = "VikingFS context database client")]
struct Cli {
    /// Daemon base URL.
    #[arg(long, env = "VIKINGFS_URL", default_value = "http://127.0.0.1:8420")]
    url: String,

    /// API key, sent as `X-API-Key`.
    #[arg(long, env = "VIKINGFS_API_KEY")]
    api_key: Option<String>,

    /// Emit the raw JSON envelope instead of a human-readable summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file, URL, or directory.
    AddResource {
        path: String,
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long)]
        wait: bool,
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List the children of a node.
    Ls {
        uri: String,
        #[arg(long)]
        recursive: bool,
        #[arg(long)]
        simple: bool,
    },
    /// Show a node's metadata.
    Stat { uri: String },
    /// Read a node's primary content.
    Read { uri: String },
    /// Vector search for resources/memories/skills.
    Find {
        query: String,
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// Regex search within a subtree.
    Grep {
        uri: String,
        pattern: String,
        #[arg(long)]
        case_insensitive: bool,
    },
    /// Create a new session and print its id.
    SessionCreate,
    /// Append a message to a session.
    SessionMessage { id: String, role: String, content: String },
    /// Commit a session (archive + extract memories).
    SessionCommit { id: String },
    /// Show daemon health.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::from(0),
        Err(CliError::Server { code, message }) => {
            if cli.json {
                eprintln!("{}", json!({"status": "error", "error": {"code": code, "message": message}}));
            } else {
                eprintln!("ERROR[{code}]: {message}");
            }
            ExitCode::from(1)
        }
        Err(CliError::Config(message)) => {
            eprintln!("ERROR[CLI_CONFIG]: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Connection(message)) => {
            eprintln!("ERROR[CONNECTION_ERROR]: {message}");
            ExitCode::from(3)
        }
    }
}

enum CliError {
    Server { code: String, message: String },
    Config(String),
    Connection(String),
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let client = build_client(cli)?;

    let (method, path, body) = match &cli.command {
        Commands::AddResource { path, target, reason, wait, timeout } => (
            reqwest::Method::POST,
            "/api/v1/resources".to_string(),
            json!({"path": path, "target": target, "reason": reason, "wait": wait, "timeout": timeout}),
        ),
        Commands::Ls { uri, recursive, simple } => (
            reqwest::Method::GET,
            format!("/api/v1/fs/ls?uri={}&recursive={}&simple={}", urlencode(uri), recursive, simple),
            Value::Null,
        ),
        Commands::Stat { uri } => (reqwest::Method::GET, format!("/api/v1/fs/stat?uri={}", urlencode(uri)), Value::Null),
        Commands::Read { uri } => (reqwest::Method::GET, format!("/api/v1/content/read?uri={}", urlencode(uri)), Value::Null),
        Commands::Find { query, limit } => (reqwest::Method::POST, "/api/v1/search/find".to_string(), json!({"query": query, "limit": limit})),
        Commands::Grep { uri, pattern, case_insensitive } => (
            reqwest::Method::POST,
            "/api/v1/search/grep".to_string(),
            json!({"uri": uri, "pattern": pattern, "case_insensitive": case_insensitive}),
        ),
        Commands::SessionCreate => (reqwest::Method::POST, "/api/v1/sessions".to_string(), Value::Null),
        Commands::SessionMessage { id, role, content } => (
            reqwest::Method::POST,
            format!("/api/v1/sessions/{id}/messages"),
            json!({"role": role, "content": content}),
        ),
        Commands::SessionCommit { id } => (reqwest::Method::POST, format!("/api/v1/sessions/{id}/commit"), Value::Null),
        Commands::Health => (reqwest::Method::GET, "/health".to_string(), Value::Null),
    };

    let url = format!("{}{path}", cli.url.trim_end_matches('/'));
    let mut request = client.request(method, &url);
    if !body.is_null() {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(|e| CliError::Connection(e.to_string()))?;
    let status = response.status();
    let envelope: Value = response.json().await.map_err(|e| CliError::Connection(e.to_string()))?;

    if !status.is_success() {
        let code = envelope.pointer("/error/code").and_then(Value::as_str).unwrap_or("INTERNAL").to_string();
        let message = envelope.pointer("/error/message").and_then(Value::as_str).unwrap_or("request failed").to_string();
        return Err(CliError::Server { code, message });
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    } else {
        let result = envelope.get("result").cloned().unwrap_or(Value::Null);
        println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
    }
    Ok(())
}

fn build_client(cli: &Cli) -> Result<reqwest::Client, CliError> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(key) = &cli.api_key {
        let value = reqwest::header::HeaderValue::from_str(key).map_err(|e| CliError::Config(format!("invalid API key: {e}")))?;
        headers.insert("X-API-Key", value);
    }
    reqwest::Client::builder().default_headers(headers).build().map_err(|e| CliError::Config(e.to_string()))
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
