//! polls server binary.
//!
//! Reads `polls.toml` (or the path specified with `--config`), opens the
//! SQLite store, and either serves the site over HTTP or runs one of the
//! operator subcommands.
//!
//! # Creating a poll
//!
//! ```
//! cargo run -p polls-web --bin server -- add-question \
//!   --text "Tea or coffee?" --end 2030-01-01T00:00:00Z \
//!   --choice Tea --choice Coffee
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use polls_core::{
  question::{NewQuestion, QuestionId},
  store::PollStore,
};
use polls_store_sqlite::SqliteStore;
use polls_web::{AppState, MAX_SESSION_TTL_HOURS, ServerConfig};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Voting window used when `--end` is omitted.
const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Parser)]
#[command(author, version, about = "Polls web server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "polls.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run the HTTP server (the default).
  Serve,

  /// Create a question with its choices.
  AddQuestion {
    #[arg(long)]
    text:     String,
    /// Publish time (RFC 3339). Defaults to now.
    #[arg(long = "pub")]
    pub_date: Option<DateTime<Utc>>,
    /// End of voting (RFC 3339). Defaults to a week after publishing.
    #[arg(long = "end")]
    end_date: Option<DateTime<Utc>>,
    /// A choice; repeat for each option.
    #[arg(long = "choice")]
    choices:  Vec<String>,
  },

  /// Print every question, newest first.
  ListQuestions {
    /// Emit JSON instead of tab-separated lines.
    #[arg(long)]
    json: bool,
  },

  /// Delete a question with its choices and votes.
  DeleteQuestion { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("POLLS").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  anyhow::ensure!(
    server_cfg.session_ttl().is_some(),
    "session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {}",
    server_cfg.session_ttl_hours
  );

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::AddQuestion { text, pub_date, end_date, choices } => {
      add_question(&store, text, pub_date, end_date, choices).await
    }
    Command::ListQuestions { json } => list_questions(&store, json).await,
    Command::DeleteQuestion { id } => {
      if store.delete_question(QuestionId(id)).await? {
        println!("deleted question {id}");
        Ok(())
      } else {
        anyhow::bail!("no question with id {id}")
      }
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg),
  };

  let app = polls_web::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn add_question(
  store: &SqliteStore,
  text: String,
  pub_date: Option<DateTime<Utc>>,
  end_date: Option<DateTime<Utc>>,
  choices: Vec<String>,
) -> anyhow::Result<()> {
  let pub_date = pub_date.unwrap_or_else(Utc::now);
  let end_date = end_date
    .or_else(|| pub_date.checked_add_signed(TimeDelta::days(DEFAULT_WINDOW_DAYS)))
    .context("--pub is too far in the future for a default --end")?;

  let (question, _) = store
    .add_poll(NewQuestion::new(text, pub_date, end_date), choices)
    .await
    .context("failed to add question")?;

  tracing::info!(question_id = %question.id, "question created");
  println!("{}", question.id);
  Ok(())
}

async fn list_questions(store: &SqliteStore, json: bool) -> anyhow::Result<()> {
  let questions = store.list_questions().await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&questions)?);
    return Ok(());
  }

  let now = Utc::now();
  for q in questions {
    println!(
      "{}\t{}\t{}\t{}\t{}",
      q.id,
      q.text,
      q.pub_date.to_rfc3339(),
      q.end_date.to_rfc3339(),
      q.was_published_recently(now),
    );
  }
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
