use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use gitping_lib::commands::{self, CheckResponse, ListEntry, LoginInput, LoginResponse, StatusResponse};
use gitping_lib::error::AppError;
use gitping_lib::models::{Category, ChangePolicy};
use gitping_lib::services::{CycleRunner, LogAlertSink, StateStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Polls GitHub for pull requests that need your attention", long_about = None)]
struct Cli {
    /// Path to SQLite DB file (default: OS data dir)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Use in-memory store instead of SQLite
    #[arg(long, global = true, default_value_t = false)]
    memory: bool,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save GitHub credentials and polling preferences
    Login {
        #[arg(long)]
        username: String,

        /// Personal access token (falls back to GITHUB_TOKEN)
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,

        /// API base URL, e.g. https://ghe.example.com/api/v3
        #[arg(long)]
        api_base_url: Option<String>,

        /// Polling interval in minutes
        #[arg(long)]
        interval: Option<u64>,

        /// Only search mentions updated within this many days
        #[arg(long)]
        mention_window_days: Option<u32>,

        /// What counts as a new pull request
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Do not check the token against GitHub
        #[arg(long, default_value_t = false)]
        no_verify: bool,
    },

    /// Run one polling cycle
    Check,

    /// Poll until interrupted
    Watch {
        /// Override the stored polling interval (minutes)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show last update, last error and counts
    Status,

    /// List stored pull requests and mentions
    List {
        /// personal, team, mine or mentions
        category: Option<Category>,
    },

    /// Remember that the list has been looked at
    MarkViewed,

    /// Print the review-requested page URL
    ReviewUrl,

    /// Forget credentials and cached results
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// A head commit not seen in the previous cycle
    HeadCommit,
    /// Updated after the last mark-viewed
    UpdatedSinceViewed,
}

impl From<PolicyArg> for ChangePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::HeadCommit => ChangePolicy::HeadCommit,
            PolicyArg::UpdatedSinceViewed => ChangePolicy::UpdatedSinceViewed,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let store = gitping_lib::open_store(cli.db_path.as_deref(), cli.memory).await?;
    let json = cli.json;

    match cli.command {
        Command::Login {
            username,
            token,
            api_base_url,
            interval,
            mention_window_days,
            policy,
            no_verify,
        } => {
            let response = commands::login(
                &store,
                LoginInput {
                    username,
                    token,
                    api_base_url,
                    polling_interval_minutes: interval,
                    mention_window_days,
                    change_policy: policy.map(ChangePolicy::from),
                    skip_verify: no_verify,
                },
            )
            .await?;
            emit(json, &response, print_login)
        }
        Command::Check => {
            let response = commands::check(&runner(store)).await?;
            emit(json, &response, print_check)
        }
        Command::Watch { interval } => commands::watch(runner(store), interval).await,
        Command::Status => {
            let response = commands::status(&store).await?;
            emit(json, &response, print_status)
        }
        Command::List { category } => {
            let entries = commands::list(&store, category).await?;
            emit(json, &entries, |e| print_list(e))
        }
        Command::MarkViewed => {
            let at = commands::mark_viewed(&store).await?;
            emit(json, &at, |at| println!("Marked as viewed at {}", at.to_rfc3339()))
        }
        Command::ReviewUrl => {
            let url = commands::review_url(&store).await?;
            emit(json, &url, |url| println!("{}", url))
        }
        Command::Reset => {
            commands::reset(&store).await?;
            emit(json, &serde_json::json!({"reset": true}), |_| {
                println!("Credentials and cached results removed")
            })
        }
    }
}

fn runner(store: StateStore) -> CycleRunner {
    CycleRunner::new(store, Arc::new(LogAlertSink))
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn print_login(response: &LoginResponse) {
    println!("Saved credentials for {} ({})", response.username, response.api_base_url);
    match &response.verified_login {
        Some(login) if response.login_mismatch => {
            println!("Warning: the token belongs to {}", login)
        }
        Some(_) => println!("Token verified"),
        None => println!("Token not verified"),
    }
    println!(
        "Polling every {} minute(s), policy {}",
        response.polling_interval_minutes, response.change_policy
    );
}

fn print_check(response: &CheckResponse) {
    println!("{} new item(s)", response.new_total);
    for (new, total) in response.new_by_category.iter().zip(&response.totals) {
        println!("  {:<10} {:>3} new / {:>3}", new.category.to_string(), new.count, total.count);
    }
}

fn print_status(response: &StatusResponse) {
    match &response.username {
        Some(user) => println!("User:         {}", user),
        None => println!("User:         (not logged in)"),
    }
    if let Some(url) = &response.api_base_url {
        println!("API:          {}", url);
    }
    match response.last_update_time {
        Some(at) => println!("Last update:  {}", at.to_rfc3339()),
        None => println!("Last update:  never"),
    }
    if let Some(at) = response.last_viewed_time {
        println!("Last viewed:  {}", at.to_rfc3339());
    }
    if let Some(err) = &response.last_error {
        println!("Last error:   {}", err);
    }
    for count in &response.counts {
        println!("  {:<24} {}", count.category.label(), count.count);
    }
}

fn print_list(entries: &[ListEntry]) {
    if entries.is_empty() {
        println!("Nothing to show");
        return;
    }
    let mut current: Option<Category> = None;
    for entry in entries {
        if current != Some(entry.category) {
            println!("== {} ==", entry.category.label());
            current = Some(entry.category);
        }
        println!(
            "{} {} | {}{}",
            if entry.unseen { "*" } else { " " },
            entry.repository,
            entry.title,
            if entry.draft { " [draft]" } else { "" }
        );
        println!(
            "    by {} · created {} · updated {}",
            entry.author.as_deref().unwrap_or("unknown"),
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.updated_at.format("%Y-%m-%d %H:%M")
        );
        println!("    {}", entry.url);
    }
}
