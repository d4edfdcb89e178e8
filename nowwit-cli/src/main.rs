//! nowwit: answer today's question, get a Web3 insight card, grow a collection
//!
//! The collection lives in a local JSON file; card generation goes through a
//! running `nowwit-server`.
//!
//! # Subcommands
//! - `question`                                  : print a random question
//! - `ask`                                       : interactive: question, answer, card, keep it?
//! - `generate <answer> [--question <q>] [--no-collect]`: one-shot generation
//! - `list [-n <limit>]`                         : cards, newest first
//! - `quota`                                     : cards left today
//! - `calendar`                                  : cards grouped by local date
//! - `concepts`                                  : one line per concept collected
//! - `status`                                    : server health

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nowwit_core::session::Outcome;
use nowwit_core::views::rarity_counts;
use nowwit_core::{
    Availability, Card, CardSession, ConceptSummary, FileSlot, InsightClient, NowwitConfig,
    QuestionPicker, RemoteCardGenerator, StorageSlot,
};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "nowwit",
    version,
    about = "NowWit: daily emotion-based Web3 insight cards"
)]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, default_value = "nowwit.toml")]
    config: String,

    /// NowWit server URL (overrides [client].server_url)
    #[arg(long, env = "NOWWIT_SERVER_URL")]
    server: Option<String>,

    /// Collection file (overrides [collection].store_path)
    #[arg(long, env = "NOWWIT_STORE")]
    store: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a random question
    Question,

    /// Answer a question interactively and decide whether to keep the card
    Ask,

    /// Generate a card for an answer
    Generate {
        /// Your answer
        answer: String,

        /// Question being answered (random if omitted)
        #[arg(short, long)]
        question: Option<String>,

        /// Show the card without adding it to the collection
        #[arg(long)]
        no_collect: bool,
    },

    /// List collected cards, newest first
    List {
        /// Maximum number of cards to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show how many cards can still be generated today
    Quota,

    /// Cards grouped by local date
    Calendar,

    /// Concepts collected so far
    Concepts,

    /// Show NowWit server status
    Status,
}

type Session = CardSession<FileSlot, InsightClient>;

// ============================================================================
// Rendering
// ============================================================================

/// Full card, as shown right after generation.
pub fn render_card(card: &Card) -> String {
    let i = &card.insight;
    format!(
        "{} {}  [{}]\n\nQ. {}\nA. {}\n\n관련 Web3 개념: {}\n{}\n\nBase 생태계 예시: {}\n{}\n\nInsight Note\n{}\n",
        i.emoji,
        i.spirit_name,
        i.rarity,
        card.question,
        card.answer,
        i.concept,
        i.concept_description,
        i.base_project,
        i.base_url,
        i.story,
    )
}

/// One line per card.
pub fn render_card_line(card: &Card) -> String {
    let i = &card.insight;
    format!(
        "{} {:<24} {:<7} {} · {}",
        i.emoji, i.spirit_name, i.rarity, i.concept, i.base_project
    )
}

pub fn render_calendar(groups: &BTreeMap<String, Vec<Card>>) -> String {
    let mut out = String::new();
    // newest day first, matching the collection order
    for (date, cards) in groups.iter().rev() {
        let emojis: String = cards.iter().map(|c| c.insight.emoji.as_str()).collect();
        out.push_str(&format!("{}  {} ({})\n", date, emojis, cards.len()));
        for card in cards {
            out.push_str(&format!("    {}\n", render_card_line(card)));
        }
    }
    out
}

pub fn render_concepts(summaries: &[ConceptSummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        let span = if s.first_date == s.last_date {
            s.first_date.clone()
        } else {
            format!("{} → {}", s.first_date, s.last_date)
        };
        out.push_str(&format!(
            "{} ×{}  ({})\n    {}\n    {} <{}>\n",
            s.concept, s.count, span, s.concept_description, s.base_project, s.base_url
        ));
    }
    out
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn open_session(config: &NowwitConfig) -> anyhow::Result<Session> {
    let store_path: PathBuf = config.collection.resolved_store_path();
    tracing::debug!(store = %store_path.display(), server = %config.client.server_url, "Opening session");
    Ok(CardSession::from_config(config, store_path)?)
}

/// Generate for the session's current question; optionally keep the card.
async fn run_generation(session: &Session, answer: &str, collect: bool, json: bool) -> anyhow::Result<()> {
    match session.generate(answer).await {
        Ok(Outcome::Generated(card)) => {
            let kept = collect && session.collect(card.clone());
            if json {
                print_json(&serde_json::json!({ "card": card, "collected": kept }))?;
            } else {
                println!("{}", render_card(&card));
                if kept {
                    println!("컬렉션에 담았어요. 오늘 남은 카드: {}", session.remaining_today());
                }
            }
            Ok(())
        }
        Ok(Outcome::Disabled(why)) => {
            eprintln!("nowwit: {}", why.message());
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "Card generation failed");
            eprintln!("nowwit: card generation failed, try again shortly");
            std::process::exit(1);
        }
    }
}

/// Print `prompt` and read one line. `None` at end of input.
fn read_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> io::Result<Option<String>> {
    write!(out, "{}", prompt)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// How an interactive round ended.
#[derive(Debug, PartialEq, Eq)]
enum AskEnd {
    Collected,
    Declined,
    NoAnswer,
    Disabled(Availability),
}

/// Question, answer, card, keep-it prompt. A blank line asks for another
/// question; end of input stops without generating.
async fn ask<S, G, R, W>(session: &CardSession<S, G>, input: &mut R, out: &mut W) -> anyhow::Result<AskEnd>
where
    S: StorageSlot,
    G: RemoteCardGenerator,
    R: BufRead,
    W: Write,
{
    let remaining = session.remaining_today();
    writeln!(out, "오늘 남은 카드: {}/{}", remaining, session.gate().limit())?;
    if remaining == 0 {
        return Ok(AskEnd::Disabled(Availability::QuotaExhausted));
    }

    let answer = loop {
        writeln!(out, "\nQ. {}", session.current_question())?;
        match read_line(input, out, "A. (빈 줄: 다른 질문 받기) ")? {
            None => return Ok(AskEnd::NoAnswer),
            Some(line) if !line.trim().is_empty() => break line,
            Some(_) => {
                session.next_question();
            }
        }
    };

    let card = match session.generate(&answer).await {
        Ok(Outcome::Generated(card)) => card,
        Ok(Outcome::Disabled(why)) => return Ok(AskEnd::Disabled(why)),
        Err(e) => {
            tracing::error!(error = %e, "Card generation failed");
            anyhow::bail!("card generation failed, try again shortly");
        }
    };

    writeln!(out, "\n{}", render_card(&card))?;
    let keep = match read_line(input, out, "이 카드를 컬렉션에 담을까요? [Y/n] ")? {
        Some(keep) => keep.trim().is_empty() || keep.trim().eq_ignore_ascii_case("y"),
        None => false,
    };
    if !keep {
        return Ok(AskEnd::Declined);
    }
    session.collect(card);
    writeln!(out, "담았어요. 오늘 남은 카드: {}", session.remaining_today())?;
    Ok(AskEnd::Collected)
}

async fn do_ask(session: &Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    match ask(session, &mut stdin.lock(), &mut stdout.lock()).await? {
        AskEnd::Collected | AskEnd::Declined => Ok(()),
        AskEnd::NoAnswer => {
            eprintln!("nowwit: no answer given");
            std::process::exit(2);
        }
        AskEnd::Disabled(why) => {
            eprintln!("nowwit: {}", why.message());
            std::process::exit(2);
        }
    }
}

fn do_list(session: &Session, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let cards = session.cards();
    let shown = &cards[..limit.unwrap_or(cards.len()).min(cards.len())];
    if json {
        return print_json(&shown);
    }
    if shown.is_empty() {
        eprintln!("아직 수집한 Insight 카드가 없어요.");
        return Ok(());
    }
    for card in shown {
        println!("{}", render_card_line(card));
    }
    let tiers: Vec<String> = rarity_counts(&cards)
        .into_iter()
        .map(|(r, n)| format!("{} {}", r, n))
        .collect();
    println!("\n{} cards · {}", cards.len(), tiers.join(" · "));
    Ok(())
}

fn do_quota(session: &Session, json: bool) -> anyhow::Result<()> {
    let remaining = session.remaining_today();
    let limit = session.gate().limit();
    if json {
        return print_json(&serde_json::json!({
            "limit": limit,
            "remaining": remaining,
            "exhausted": remaining == 0,
        }));
    }
    println!("오늘 남은 카드: {}/{}", remaining, limit);
    if remaining == 0 {
        println!("{}", Availability::QuotaExhausted.message());
    }
    Ok(())
}

async fn do_status(client: &InsightClient) -> anyhow::Result<()> {
    match client.health().await {
        Ok(body) => {
            println!("NowWit server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("Model:         {}", body["model"].as_str().unwrap_or("?"));
            println!("Configured:    {}", body["configured"].as_bool().unwrap_or(false));
        }
        Err(e) => {
            eprintln!("nowwit: cannot reach {}: {}", client.server_url(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match NowwitConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("nowwit: failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };
    if let Some(server) = cli.server {
        config.client.server_url = server;
    }
    if let Some(store) = cli.store {
        config.collection.store_path = store;
    }

    let result = match cli.command {
        Commands::Question => match QuestionPicker::new(config.collection.questions.iter().cloned()) {
            Some(picker) => {
                println!("{}", picker.pick());
                Ok(())
            }
            None => Err(anyhow::anyhow!("no questions configured")),
        },
        Commands::Status => match InsightClient::from_config(&config.client) {
            Ok(client) => do_status(&client).await,
            Err(e) => Err(e.into()),
        },
        command => match open_session(&config) {
            Ok(session) => match command {
                Commands::Ask => do_ask(&session).await,
                Commands::Generate {
                    answer,
                    question,
                    no_collect,
                } => {
                    match question {
                        Some(q) => session.set_question(q),
                        None if !cli.json => println!("Q. {}", session.current_question()),
                        None => {}
                    }
                    run_generation(&session, &answer, !no_collect, cli.json).await
                }
                Commands::List { limit } => do_list(&session, limit, cli.json),
                Commands::Quota => do_quota(&session, cli.json),
                Commands::Calendar => {
                    let groups = session.calendar();
                    if cli.json {
                        print_json(&groups)
                    } else {
                        print!("{}", render_calendar(&groups));
                        Ok(())
                    }
                }
                Commands::Concepts => {
                    let summaries = session.concepts();
                    if cli.json {
                        print_json(&summaries)
                    } else {
                        print!("{}", render_concepts(&summaries));
                        Ok(())
                    }
                }
                Commands::Question | Commands::Status => Ok(()),
            },
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("nowwit: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
