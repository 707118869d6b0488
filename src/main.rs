//! CLI entry point for `epistle`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use unicode_width::UnicodeWidthChar;

use epistle::config::Config;
use epistle::index::IndexClient;
use epistle::model::account::Account;
use epistle::model::message::Message;
use epistle::render::CommandRenderer;
use epistle::store::mutation::FileOp;

#[derive(Parser)]
#[command(
    name = "epistle",
    version,
    about = "Watch, read, archive and delete mail in a notmuch-indexed maildir"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for unread mail and print each new message once
    Watch {
        /// Check once and exit
        #[arg(long)]
        once: bool,
        /// Seconds between checks (overrides the config file)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// List unread messages that are not in trash
    Unread {
        /// Prefix each line with the message id
        #[arg(long)]
        ids: bool,
        #[arg(long)]
        json: bool,
    },
    /// List inbox threads, for one account or all of them
    Inbox {
        account: Option<String>,
        /// Prefix each line with the message id
        #[arg(long)]
        ids: bool,
    },
    /// Print a whole thread as text
    Show { id: String },
    /// List the attachments of a message
    Attachments { id: String },
    /// Save one attachment of a message
    Save {
        id: String,
        part: u32,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Write a message as a text file
    Export {
        id: String,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Archive a message
    Archive { id: String },
    /// Move a message to trash
    Delete { id: String },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = epistle::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Watch { once, interval } => cmd_watch(&config, once, interval),
        Commands::Unread { ids, json } => cmd_unread(&config, ids, json),
        Commands::Inbox { account, ids } => cmd_inbox(&config, account.as_deref(), ids),
        Commands::Show { id } => cmd_show(&config, &id),
        Commands::Attachments { id } => cmd_attachments(&config, &id),
        Commands::Save { id, part, output } => cmd_save(&config, &id, part, &output),
        Commands::Export { id, output } => cmd_export(&config, &id, &output),
        Commands::Archive { id } => cmd_archive(&config, &id),
        Commands::Delete { id } => cmd_delete(&config, &id),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = epistle::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "epistle.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn renderer(config: &Config) -> anyhow::Result<CommandRenderer> {
    Ok(CommandRenderer::from_command(&config.render.html_command)?)
}

/// Block while the index is locked, showing a spinner if we have to wait.
fn wait_until_unlocked(client: &IndexClient) {
    if !client.is_locked() {
        return;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Index is locked, waiting");
    client.wait_for_lock_state(
        false,
        Some(&|elapsed: Duration| {
            pb.set_message(format!("Index is locked, waiting ({}s)", elapsed.as_secs()));
        }),
    );
    pb.finish_and_clear();
}

/// Unread, non-trash messages, oldest first.
fn unread_not_trashed(client: &IndexClient) -> anyhow::Result<Vec<Message>> {
    let mut messages = Vec::new();
    for message in client.query_unread()? {
        let message = message?;
        if !message.in_trash()? {
            messages.push(message);
        }
    }
    messages.sort_by_key(Message::timestamp);
    Ok(messages)
}

fn cmd_watch(config: &Config, once: bool, interval: Option<u64>) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    let interval = Duration::from_secs(interval.unwrap_or(config.watch.interval_secs));
    let mut shown: HashSet<String> = HashSet::new();

    loop {
        wait_until_unlocked(&client);
        let unread = unread_not_trashed(&client)?;
        for message in newly_unread(&mut shown, &unread) {
            println!("{}", clip(&message.display_line()?, config.display.max_width));
        }
        if once {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

/// Messages not announced yet. `shown` ends up holding exactly the ids in `unread`.
fn newly_unread<'a>(shown: &mut HashSet<String>, unread: &'a [Message]) -> Vec<&'a Message> {
    let current: HashSet<&str> = unread.iter().map(Message::id).collect();
    shown.retain(|id| current.contains(id.as_str()));
    unread
        .iter()
        .filter(|m| shown.insert(m.id().to_string()))
        .collect()
}

fn cmd_unread(config: &Config, ids: bool, json: bool) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    wait_until_unlocked(&client);
    let messages = unread_not_trashed(&client)?;

    if json {
        print_messages_json(&messages)?;
    } else {
        for message in &messages {
            print_line(message, ids, config)?;
        }
    }
    Ok(())
}

fn cmd_inbox(config: &Config, account: Option<&str>, ids: bool) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    wait_until_unlocked(&client);

    let messages = match account {
        Some(name) => {
            let account = Account::new(name);
            if !client.accounts().contains(&account) {
                anyhow::bail!("Unknown account '{}'", name);
            }
            client.account_threads(&account)?
        }
        None => client.inbox_threads()?,
    };
    for message in messages {
        print_line(&message?, ids, config)?;
    }
    Ok(())
}

fn cmd_show(config: &Config, id: &str) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    let renderer = renderer(config)?;
    for message in client.thread(id)? {
        let message = message?;
        println!("{}", "=".repeat(72));
        println!("{}", message.as_text(&renderer)?);
        let attachments = message.attachments();
        if !attachments.is_empty() {
            println!("[{} attachment(s)]", attachments.len());
        }
    }
    Ok(())
}

fn cmd_attachments(config: &Config, id: &str) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let client = IndexClient::open(&config.notmuch)?;
    let message = client.find_message(id)?;
    let attachments = message.attachments();
    if attachments.is_empty() {
        println!("  No attachments.");
        return Ok(());
    }

    println!("  {:<6} {:<40} {:<30} {:>10}", "Part", "Filename", "Type", "Size");
    println!("  {}", "-".repeat(89));
    for att in &attachments {
        let size = att
            .size
            .map(|s| format_size(s, BINARY))
            .unwrap_or_else(|| "?".to_string());
        let name: String = att.filename.chars().take(39).collect();
        println!(
            "  {:<6} {:<40} {:<30} {:>10}",
            att.part, name, att.content_type, size
        );
    }
    Ok(())
}

fn cmd_save(config: &Config, id: &str, part: u32, output: &Path) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    let message = client.find_message(id)?;
    let content = client.fetch_attachment(&message, part)?;
    let path = epistle::export::attachment::save_attachment(&content, output)?;
    println!("  Saved {}", path.display());
    Ok(())
}

fn cmd_export(config: &Config, id: &str, output: &Path) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    let message = client.find_message(id)?;
    let path = epistle::export::text::export_text(&message, &renderer(config)?, output)?;
    println!("  Exported {}", path.display());
    Ok(())
}

fn cmd_archive(config: &Config, id: &str) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    wait_until_unlocked(&client);
    let message = client.find_message(id)?;
    let ops = client.archive(message)?;
    print_ops("Archived", id, &ops);
    Ok(())
}

fn cmd_delete(config: &Config, id: &str) -> anyhow::Result<()> {
    let client = IndexClient::open(&config.notmuch)?;
    wait_until_unlocked(&client);
    let message = client.find_message(id)?;
    let ops = client.delete(message)?;
    print_ops("Deleted", id, &ops);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "epistle", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn print_line(message: &Message, ids: bool, config: &Config) -> anyhow::Result<()> {
    let line = message.display_line()?;
    let line = if ids {
        format!("{} {}", message.id(), line)
    } else {
        line
    };
    println!("{}", clip(&line, config.display.max_width));
    Ok(())
}

fn print_ops(verb: &str, id: &str, ops: &[FileOp]) {
    println!("  {verb} {id}");
    for op in ops {
        match op {
            FileOp::Remove(path) => println!("    removed  {}", path.display()),
            FileOp::Move { from, to } | FileOp::Promote { from, to } => {
                println!("    {} -> {}", from.display(), to.display())
            }
        }
    }
}

/// Print messages as JSON.
fn print_messages_json(messages: &[Message]) -> anyhow::Result<()> {
    let items = messages
        .iter()
        .map(|m| -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({
                "id": m.id(),
                "timestamp": m.timestamp(),
                "account": m.account()?.to_string(),
                "folders": m.friendly_folders()?.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "from": m.sender(),
                "subject": m.subject(),
                "tags": m.tags(),
            }))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let output = serde_json::json!({
        "count": items.len(),
        "messages": items,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Cut `line` to at most `width` display columns (0 = no limit).
fn clip(line: &str, width: usize) -> String {
    if width == 0 {
        return line.to_string();
    }
    let mut used = 0;
    let mut out = String::with_capacity(line.len());
    for ch in line.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_by_display_width() {
        assert_eq!(clip("hello", 0), "hello");
        assert_eq!(clip("hello", 3), "hel");
        assert_eq!(clip("日本語", 4), "日本");
        assert_eq!(clip("short", 80), "short");
    }

    fn unread(ids: &[&str]) -> Vec<Message> {
        let location = epistle::model::location::IndexLocation::new("/mail").unwrap();
        ids.iter()
            .map(|id| {
                Message::from_value(
                    serde_json::json!({"id": id, "timestamp": 0, "filename": [], "headers": {}}),
                    location.clone(),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_watch_forgets_messages_once_read() {
        let mut shown = HashSet::new();

        let first = unread(&["a", "b"]);
        let ids: Vec<&str> = newly_unread(&mut shown, &first).into_iter().map(Message::id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let second = unread(&["b", "c"]);
        let ids: Vec<&str> = newly_unread(&mut shown, &second).into_iter().map(Message::id).collect();
        assert_eq!(ids, vec!["c"]);
        assert_eq!(shown.len(), 2);
        assert!(!shown.contains("a"));

        // Read, then unread again: announced a second time.
        let third = unread(&["a"]);
        assert_eq!(newly_unread(&mut shown, &third).len(), 1);
        assert_eq!(shown.len(), 1);
    }

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["epistle", "save", "abc@x", "3", "-o", "/tmp"]).unwrap();
        assert!(matches!(cli.command, Commands::Save { part: 3, .. }));
    }
}
