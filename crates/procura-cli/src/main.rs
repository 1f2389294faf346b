//! procura - conversational procurement requirement gathering

mod config;
mod session;
mod utils;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use procura_agent::{
    FinalizedRequirement, ProviderCompletion, RequirementWorkflow, TurnOutcome, VendorQuote,
};
use procura_ai::{Model, Provider};
use session::{Session, SessionStore};
use tracing_subscriber::EnvFilter;

const SYSTEM_PROMPT: &str = "You are procura, a procurement assistant. You help buyers describe \
    what they want to purchase so the request can be sent to vendors.";

/// procura - turn a purchase request into a structured requirement
#[derive(Parser, Debug)]
#[command(name = "procura")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gemini-2.5-pro)
    #[arg(short, long)]
    model: Option<String>,

    /// Provider (google, openai, groq, openrouter, ollama, custom)
    #[arg(short, long)]
    provider: Option<String>,

    /// API base URL (required for the custom provider)
    #[arg(long)]
    base_url: Option<String>,

    /// Start a conversation with this request and print the first reply
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Continue a saved session by ID
    #[arg(long)]
    resume: Option<String>,

    /// Reply to send to the resumed session (runs one turn and exits)
    #[arg(long, requires = "resume")]
    reply: Option<String>,

    /// List saved sessions
    #[arg(long)]
    sessions: bool,

    /// Print a saved session's state as JSON
    #[arg(long)]
    show: Option<String>,

    /// Delete a saved session
    #[arg(long)]
    delete: Option<String>,

    /// Suggest RFQ line items for a request
    #[arg(long)]
    suggest: Option<String>,

    /// Score vendor quotes (JSON array file) against a completed session
    #[arg(long, requires = "resume")]
    score: Option<PathBuf>,

    /// Number of quotes to shortlist when scoring
    #[arg(long, default_value_t = 3)]
    top: usize,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Everything a command needs once config and flags are merged
struct App {
    model: Model,
    completion: Arc<ProviderCompletion>,
    workflow: RequirementWorkflow,
    store: SessionStore,
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; --verbose turns on debug output for our crates
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("procura=debug,procura_agent=debug,procura_ai=debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let store = SessionStore::new(
        cfg.sessions_dir
            .clone()
            .unwrap_or_else(SessionStore::default_dir),
    );

    // Commands that never touch a model
    if args.sessions {
        return list_sessions(&store);
    }
    if let Some(ref id) = args.show {
        let session = store.load(id)?;
        println!("{}", serde_json::to_string_pretty(&session.state)?);
        return Ok(());
    }
    if let Some(ref id) = args.delete {
        store.delete(id)?;
        println!("Deleted session {}", id);
        return Ok(());
    }

    // Merge config with CLI args (CLI takes precedence)
    let provider_name = args
        .provider
        .clone()
        .or(cfg.provider.clone())
        .unwrap_or_else(|| "google".to_string());
    let provider = Provider::parse(&provider_name)
        .ok_or_else(|| anyhow!("Unknown provider: {}", provider_name))?;
    let model_id = match args.model.clone().or(cfg.model.clone()) {
        Some(id) => id,
        None => default_model_id(provider)?,
    };
    let model = cfg.resolve_model(provider, &model_id, args.base_url.as_deref());

    let api_key = cfg.get_api_key(provider);
    if api_key.is_none() {
        if let Some(var) = provider.api_key_env_var() {
            eprintln!("Error: No API key found for {}", provider.name());
            eprintln!();
            eprintln!("Set your API key with: export {}=your-key", var);
            eprintln!("Or add it to config file: procura --init-config");
            std::process::exit(1);
        }
    }

    let completion = Arc::new(ProviderCompletion::from_config(
        cfg.completion_config(model.clone(), SYSTEM_PROMPT),
        api_key.as_deref(),
        cfg.timeout(),
    )?);
    let ctx = App {
        workflow: RequirementWorkflow::new(completion.clone()),
        completion,
        model,
        store,
        verbose: args.verbose,
    };

    let result = run(&ctx, args).await;
    if ctx.verbose {
        eprintln!(
            "{}",
            utils::usage_line(&ctx.completion.total_usage(), &ctx.model)
        );
    }
    result
}

async fn run(ctx: &App, args: Args) -> anyhow::Result<()> {
    if let Some(query) = args.suggest {
        return suggest(ctx, &query).await;
    }

    if let Some(path) = args.score {
        let id = args
            .resume
            .ok_or_else(|| anyhow!("--score needs --resume <session-id>"))?;
        return score(ctx, &id, &path, args.top).await;
    }

    if let Some(query) = args.command {
        return run_command(ctx, &query).await;
    }

    if let Some(id) = args.resume {
        let session = ctx.store.load(&id)?;
        return match args.reply {
            Some(reply) => reply_once(ctx, session, &reply).await,
            None => run_interactive(ctx, Some(session)).await,
        };
    }

    run_interactive(ctx, None).await
}

fn default_model_id(provider: Provider) -> anyhow::Result<String> {
    if provider == Provider::Google {
        return Ok(procura_ai::models::DEFAULT_MODEL_ID.to_string());
    }
    procura_ai::models::get_models(provider)
        .into_iter()
        .next()
        .map(|m| m.id)
        .ok_or_else(|| anyhow!("No default model for {}; pass --model", provider.name()))
}

/// Start a conversation, save it and print the first reply
async fn run_command(ctx: &App, query: &str) -> anyhow::Result<()> {
    let outcome = ctx.workflow.start_conversation(query).await?;
    let session = Session::new(&ctx.model.id, outcome.state.clone());
    ctx.store.save(&session)?;
    print_outcome(&outcome);
    print_next_step(&session, &outcome);
    Ok(())
}

/// Run one turn on a saved session
async fn reply_once(ctx: &App, mut session: Session, reply: &str) -> anyhow::Result<()> {
    let outcome = ctx
        .workflow
        .continue_conversation(&session.state, reply)
        .await?;
    session.update(outcome.state.clone());
    ctx.store.save(&session)?;
    print_outcome(&outcome);
    print_next_step(&session, &outcome);
    Ok(())
}

async fn run_interactive(ctx: &App, session: Option<Session>) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    if io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!("procura ({})", ctx.model.id);
        eprintln!();
    }

    let mut session = match session {
        Some(session) => {
            if session.state.is_complete() {
                bail!("Session {} is already complete", session.id);
            }
            if let Some(last) = session.state.latest_system_message() {
                println!("{}", last);
            }
            session
        }
        None => {
            println!("What would you like to buy?");
            let outcome = loop {
                let Some(query) = prompt_line(&mut lines)? else {
                    return Ok(());
                };
                match ctx.workflow.start_conversation(&query).await {
                    Ok(outcome) => break outcome,
                    Err(e) => report_turn_error(&e),
                }
            };
            let session = Session::new(&ctx.model.id, outcome.state.clone());
            ctx.store.save(&session)?;
            print_outcome(&outcome);
            if outcome.complete {
                return Ok(());
            }
            session
        }
    };

    if ctx.verbose {
        eprintln!("session: {}", session.id);
    }

    loop {
        let Some(reply) = prompt_line(&mut lines)? else {
            println!("\nSaved. Resume with: procura --resume {}", session.id);
            return Ok(());
        };

        // A failed turn leaves the saved state untouched, so the same reply can be retried
        let outcome = match ctx
            .workflow
            .continue_conversation(&session.state, &reply)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                report_turn_error(&e);
                continue;
            }
        };

        session.update(outcome.state.clone());
        ctx.store.save(&session)?;
        print_outcome(&outcome);
        if outcome.complete {
            return Ok(());
        }
    }
}

/// Read one non-empty line. `None` on EOF.
fn prompt_line(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> anyhow::Result<Option<String>> {
    loop {
        print!("> ");
        io::stdout().flush()?;
        match lines.next() {
            None => return Ok(None),
            Some(line) => {
                let line = line?;
                let line = line.trim();
                if !line.is_empty() {
                    return Ok(Some(line.to_string()));
                }
            }
        }
    }
}

fn report_turn_error(e: &procura_agent::Error) {
    eprintln!("Error: {}", e);
    if e.is_caller_error() {
        eprintln!("This conversation cannot take that input; start a new one with `procura`.");
    } else if e.is_retryable() || e.is_schema_violation() {
        eprintln!("The service had a problem; send the same message again to retry.");
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    println!();
    println!("{}", outcome.message.trim_end());
    println!();
}

fn print_next_step(session: &Session, outcome: &TurnOutcome) {
    if outcome.complete {
        println!("Session {} is complete.", session.id);
        println!(
            "Score quotes with: procura --resume {} --score quotes.json",
            session.id
        );
    } else {
        println!(
            "Reply with: procura --resume {} --reply \"<your answer>\"",
            session.id
        );
    }
}

fn list_sessions(store: &SessionStore) -> anyhow::Result<()> {
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("No saved sessions found.");
        println!("Sessions are stored in: {}", store.dir().display());
        return Ok(());
    }

    println!("Saved sessions:\n");
    println!(
        "{:<38} {:<18} {:<10} {:<16} Request",
        "ID", "Updated", "Status", "Category"
    );
    println!("{}", "-".repeat(110));
    for s in sessions {
        println!(
            "{:<38} {:<18} {:<10} {:<16} {}",
            s.id,
            s.updated_at_display(),
            s.status(),
            utils::truncate_chars(s.category.as_deref().unwrap_or("-"), 14),
            utils::truncate_chars(&s.initial_query, 40)
        );
    }
    println!("\nResume with: procura --resume <session-id>");
    Ok(())
}

async fn suggest(ctx: &App, query: &str) -> anyhow::Result<()> {
    let suggestions = procura_agent::generate_suggestions(ctx.completion.as_ref(), query).await?;
    if suggestions.is_empty() {
        println!("No suggestions.");
    }
    for item in suggestions {
        println!("- {}", item);
    }
    Ok(())
}

async fn score(ctx: &App, id: &str, path: &Path, top: usize) -> anyhow::Result<()> {
    let session = ctx.store.load(id)?;
    let requirement = FinalizedRequirement::from_state(&session.state)
        .with_context(|| format!("Session {} has no finalized requirement", id))?;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let quotes: Vec<VendorQuote> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of quotes", path.display()))?;
    if quotes.is_empty() {
        bail!("No quotes to shortlist.");
    }

    let scored =
        procura_agent::score_quotes(ctx.completion.as_ref(), &requirement, quotes).await?;
    let ranked = procura_agent::shortlist(scored, top);

    println!("Requirement: {}\n", requirement.category);
    println!(
        "{:<3} {:<24} {:>12} {:>9} {:>7} {:>6}",
        "", "Vendor", "Amount", "Relevance", "Profile", "Final"
    );
    println!("{}", "-".repeat(68));
    for q in &ranked {
        let (relevance, profile, final_score) = q
            .scores
            .map_or((0, 0, 0), |s| (s.relevance_score, s.profile_score, s.final_score));
        println!(
            "{:<3} {:<24} {:>12} {:>9} {:>7} {:>6}",
            if q.shortlisted { "*" } else { "" },
            utils::truncate_chars(&q.quote.vendor_name, 22),
            q.quote
                .amount
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "-".to_string()),
            relevance,
            profile,
            final_score
        );
    }
    println!("\n* shortlisted (top {})", top);
    Ok(())
}
