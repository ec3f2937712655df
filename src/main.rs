use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use podsync::config::Config;
use podsync::feed::{DirectoryClient, ReqwestClient};
use podsync::storage::{Database, StoreError};
use podsync::{Library, Podcast};

/// Get the config directory path (~/.config/podsync/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("podsync");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "podsync", version, about = "Podcast feed ingestion and playback-state sync")]
struct Args {
    /// Config file (default: ~/.config/podsync/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a feed and subscribe to it
    Subscribe { url: String },
    /// Remove a subscription
    Unsubscribe { url: String },
    /// List subscribed feed URLs
    Feeds,
    /// Fetch every subscribed feed and report per-feed outcomes
    Refresh {
        #[arg(long)]
        force: bool,
    },
    /// Show one feed and its episodes
    Show {
        url: String,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// All episodes across subscriptions, newest first
    Episodes {
        #[arg(long)]
        force: bool,
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Search the podcast directory
    Search { query: String },
    /// Save a playback position in seconds
    Position { id: String, seconds: u64 },
    /// Mark an episode as played
    Played { id: String },
    /// Read or write a preference
    Pref { key: String, value: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = args
        .db
        .clone()
        .or_else(|| config.database.clone())
        .unwrap_or_else(|| config_dir.join("podsync.db"));
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(StoreError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of podsync appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let http = ReqwestClient::new(&config).context("Failed to build HTTP client")?;
    let directory = DirectoryClient::from_config(http.inner().clone(), &config);
    let library = Library::new(http, db).with_concurrency(config.max_concurrent_fetches);

    run(args.command, &library, &directory).await
}

async fn run(
    command: Command,
    library: &Library<ReqwestClient, Database>,
    directory: &DirectoryClient,
) -> Result<()> {
    match command {
        Command::Subscribe { url } => {
            let podcast = library
                .subscribe(&url)
                .await
                .with_context(|| format!("Failed to subscribe to {}", url))?;
            println!(
                "Subscribed to {} ({} episodes)",
                podcast.title,
                podcast.episodes.len()
            );
        }
        Command::Unsubscribe { url } => {
            if library.unsubscribe(&url).await? {
                println!("Unsubscribed from {}", url);
            } else {
                println!("Not subscribed: {}", url);
            }
        }
        Command::Feeds => {
            for url in library.subscriptions().await? {
                println!("{}", url);
            }
        }
        Command::Refresh { force } => {
            let results = library.fetch_subscribed(force).await?;
            let failed = results.iter().filter(|r| r.result.is_err()).count();
            for r in &results {
                match &r.result {
                    Ok(podcast) => println!(
                        "ok    {} ({} episodes)",
                        podcast.title,
                        podcast.episodes.len()
                    ),
                    Err(e) => println!("error {}: {}", r.feed_url, e),
                }
            }
            println!(
                "Refreshed {} of {} feeds",
                results.len() - failed,
                results.len()
            );
        }
        Command::Show { url, force, json } => {
            let podcast = library
                .fetch_podcast(&url, force)
                .await
                .with_context(|| format!("Failed to fetch {}", url))?;
            if json {
                println!("{}", serde_json::to_string_pretty(podcast.as_ref())?);
            } else {
                print_podcast(&podcast);
            }
        }
        Command::Episodes { force, limit, json } => {
            let mut episodes = library.get_all_episodes(force).await?;
            if let Some(limit) = limit {
                episodes.truncate(limit);
            }
            if json {
                let rows: Vec<serde_json::Value> = episodes
                    .iter()
                    .map(|(episode, podcast)| {
                        serde_json::json!({
                            "podcast": podcast.title,
                            "feed_url": podcast.feed_url,
                            "episode": episode,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for (episode, podcast) in &episodes {
                    println!(
                        "{:<14} {:<24} {}",
                        episode.publish_date_text, podcast.title, episode.title
                    );
                }
            }
        }
        Command::Search { query } => {
            let results = directory
                .search(&query)
                .await
                .context("Directory search failed")?;
            if results.is_empty() {
                println!("No podcasts found");
            }
            for entry in results {
                println!("{}\n    {}", entry.name, entry.feed_url);
            }
        }
        Command::Position { id, seconds } => {
            library.save_playback_position(&id, seconds).await?;
            println!("Saved position {}s for {}", seconds, id);
        }
        Command::Played { id } => {
            library.mark_as_played(&id).await?;
            println!("Marked {} as played", id);
        }
        Command::Pref { key, value } => {
            let store = library.store();
            match value {
                Some(value) => {
                    store.set_preference(&key, &value).await?;
                    println!("{} = {}", key, value);
                }
                None => match store.get_preference(&key).await? {
                    Some(value) => println!("{} = {}", key, value),
                    None => println!("{} is not set", key),
                },
            }
        }
    }

    Ok(())
}

fn print_podcast(podcast: &Podcast) {
    println!("{}", podcast.title);
    if let Some(author) = &podcast.author {
        println!("by {}", author);
    }
    if !podcast.description.is_empty() {
        println!("\n{}\n", podcast.description);
    }

    for episode in &podcast.episodes {
        let mut status = String::new();
        if episode.is_played {
            status.push_str(" [played]");
        } else if episode.playback_position > 0 {
            let state = episode.playback_state();
            status.push_str(&format!(
                " [at {}s, {:.0}%]",
                episode.playback_position,
                state.progress() * 100.0
            ));
        }
        let meta: Vec<String> = [episode.duration_label(), episode.file_size_label()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        println!(
            "{:<14} {}{}  {}",
            episode.publish_date_text,
            episode.title,
            status,
            meta.join(" · ")
        );
        println!("               id: {}", episode.id());
    }
}
