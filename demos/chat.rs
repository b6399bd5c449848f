//! Interactive demo of the ContextGuard dispatcher.
//!
//! Usage:
//!   cargo run --example chat --features test-support
//!   cargo run --example chat --features test-support -- --max-tokens 2000 --sliding-window 6
//!
//! Each line you type is appended as a user turn to a growing conversation.
//! A `MockSummarizerProvider` stands in for the real LLM client the host
//! runtime would otherwise supply, so the demo can run with no network
//! access and no API key — the point is to watch compaction fire, not to
//! talk to a model. Ctrl-C or type "exit" / "quit" to leave.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use contextguard::{
    CompactionObserver, CompactionOutcome, InMemoryStateStore, Message, PluginDispatcher,
    StaticModelRegistry,
};
use contextguard::provider::mock::MockSummarizerProvider;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "chat", about = "Watch ContextGuard compact a growing conversation")]
struct Cli {
    /// Model id to register the agent against (only affects the registry
    /// lookup unless --max-tokens overrides it).
    #[arg(long, default_value = "demo-model")]
    model: String,

    /// Bypass the model registry and use this context window directly.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Use the sliding-window strategy with this many max turns instead of
    /// the default threshold strategy.
    #[arg(long)]
    sliding_window: Option<i64>,
}

struct EventPrinter;

impl CompactionObserver for EventPrinter {
    fn on_compacted(&self, agent_id: &str, strategy: &str, outcome: CompactionOutcome) {
        eprintln!(
            "\x1b[35m  [compacted agent={agent_id} strategy={strategy}: {} -> {} tokens]\x1b[0m",
            outcome.pre_tokens, outcome.post_tokens
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let state = Arc::new(InMemoryStateStore::new());
    let provider = Arc::new(MockSummarizerProvider::returning(
        "the conversation so far covered the user's request and the assistant's progress",
    ));
    let registry = Arc::new(StaticModelRegistry::new().with_model(&cli.model, 8_000, 1_024));

    let dispatcher =
        PluginDispatcher::new(state, provider, registry).with_observer(Arc::new(EventPrinter));

    let agent_id = "demo-agent";
    let mut builder = dispatcher.register_agent(agent_id, &cli.model);
    if let Some(turns) = cli.sliding_window {
        builder = builder.with_sliding_window(turns);
    }
    if let Some(max_tokens) = cli.max_tokens {
        builder = builder.with_max_tokens(max_tokens);
    }
    builder.finish().await;

    eprintln!("contextguard demo");
    eprintln!("model: {}", cli.model);
    eprintln!("strategy: {}", if cli.sliding_window.is_some() { "sliding_window" } else { "threshold" });
    eprintln!("type a message and press enter; longer messages push the window toward compaction");
    eprintln!("---");

    let mut conversation: Vec<Message> = Vec::new();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

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

        conversation.push(Message::user_text(trimmed));
        conversation.push(Message::model_text(format!(
            "acknowledged: {trimmed}"
        )));

        let mut request = contextguard::ConversationRequest {
            messages: conversation.clone(),
            system_instruction: None,
            tools: vec![],
            max_output_tokens: 0,
        };

        let cancel = CancellationToken::new();
        dispatcher
            .before_model(agent_id, &mut request, &[], &cancel)
            .await;

        conversation = request.messages;

        eprintln!(
            "\x1b[2m  [{} messages in the live request]\x1b[0m",
            conversation.len()
        );
    }

    eprintln!("bye.");
}
