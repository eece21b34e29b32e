use std::env;
use std::path::{Path, PathBuf};

use postsync_core::connectivity::{ConnectivityProbe, FixedConnectivity, TcpConnectivityProbe};
use postsync_core::db::{Database, LibSqlPostStore};
use postsync_core::remote::HttpRemoteSource;
use postsync_core::util::{is_http_url, normalize_text_option};
use postsync_core::{ClientConfig, FeedEvent, Post, PostId, SyncEngine};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::error::CliError;

const PREVIEW_CHARS: usize = 60;

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub api_url: Option<String>,
    pub offline: bool,
}

impl GlobalOptions {
    pub fn resolve(db_path: Option<PathBuf>, api_url: Option<String>, offline: bool) -> Self {
        Self {
            db_path: resolve_db_path(db_path),
            config_path: resolve_config_path(),
            api_url: normalize_text_option(api_url),
            offline,
        }
    }
}

/// Connectivity source for the CLI: a real probe, or forced offline
#[derive(Debug, Clone)]
pub enum Connectivity {
    Probe(TcpConnectivityProbe),
    Fixed(FixedConnectivity),
}

impl ConnectivityProbe for Connectivity {
    async fn is_online(&self) -> bool {
        match self {
            Self::Probe(probe) => probe.is_online().await,
            Self::Fixed(fixed) => fixed.is_online().await,
        }
    }
}

pub type CliEngine = SyncEngine<HttpRemoteSource, LibSqlPostStore, Connectivity>;

/// An engine plus the database its store writes to
pub struct Session {
    pub engine: CliEngine,
    _db: Database,
}

#[derive(Debug, Serialize)]
pub struct PostListItem {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub is_liked: bool,
    pub preview: String,
}

pub async fn open_session(options: &GlobalOptions) -> Result<Session, CliError> {
    let config = load_client_config(options)?;
    let db = open_database(&options.db_path).await?;
    let remote = HttpRemoteSource::new(config.api_base_url.clone())?;
    let probe = build_probe(&config, options.offline)?;

    let engine = SyncEngine::new(config.engine_config(), remote, db.post_store(), probe);
    spawn_event_logger(&engine);

    Ok(Session { engine, _db: db })
}

pub async fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path).await?)
}

/// Config file, then `POSTSYNC_*` environment, then `--api-url`
pub fn load_client_config(options: &GlobalOptions) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::load_from_path(&options.config_path)?.with_process_env()?;
    if let Some(url) = &options.api_url {
        if !is_http_url(url) {
            return Err(CliError::Config(format!(
                "--api-url must include http:// or https:// (got {url})"
            )));
        }
        config.api_base_url.clone_from(url);
    }
    Ok(config)
}

pub fn build_probe(config: &ClientConfig, offline: bool) -> Result<Connectivity, CliError> {
    if offline {
        return Ok(Connectivity::Fixed(FixedConnectivity::offline()));
    }
    let probe = match &config.probe_address {
        Some(address) => TcpConnectivityProbe::new(address.clone()),
        None => TcpConnectivityProbe::for_base_url(&config.api_base_url)?,
    };
    Ok(Connectivity::Probe(probe))
}

fn spawn_event_logger(engine: &CliEngine) {
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(FeedEvent::LoadingChanged(loading)) => {
                    tracing::debug!("Feed loading: {loading}");
                }
                Ok(FeedEvent::ItemChanged(index)) => {
                    tracing::debug!("Feed item {index} changed");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {skipped} feed events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

pub fn print_posts(posts: &[Post], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let json_items = posts
            .iter()
            .map(post_to_list_item)
            .collect::<Vec<PostListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if posts.is_empty() {
        println!("No posts");
    } else {
        for line in format_post_lines(posts) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_post_lines(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .map(|post| {
            let marker = if post.liked() { "♥" } else { " " };
            format!(
                "{marker} {:>4}  {}",
                post.id.get(),
                post_preview(post, PREVIEW_CHARS)
            )
        })
        .collect()
}

pub fn post_to_list_item(post: &Post) -> PostListItem {
    PostListItem {
        id: post.id.get(),
        user_id: post.user_id,
        title: post.title.clone(),
        body: post.body.clone(),
        is_liked: post.liked(),
        preview: post_preview(post, PREVIEW_CHARS),
    }
}

/// First line of the title, truncated to `max_chars`
pub fn post_preview(post: &Post, max_chars: usize) -> String {
    let first_line = post.title.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "(untitled)".to_string();
    }
    if first_line.chars().count() <= max_chars {
        return first_line.to_string();
    }
    let truncated: String = first_line
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect();
    format!("{truncated}...")
}

pub fn parse_post_id(raw: &str) -> Result<PostId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyPostId);
    }
    trimmed
        .parse()
        .map_err(|_| CliError::InvalidPostId(trimmed.to_string()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("POSTSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("postsync")
        .join("posts.db")
}

pub fn resolve_config_path() -> PathBuf {
    env::var_os("POSTSYNC_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("postsync")
        .join("config.json")
}
