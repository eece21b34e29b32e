//! postsync-core - Core library for postsync
//!
//! This crate contains the post models, the local store and remote source
//! boundaries, and the sync engine that reconciles them. The CLI is a thin
//! layer over [`SyncEngine`].

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;
pub mod util;

pub use config::{ClientConfig, EngineConfig, PageFailurePolicy};
pub use connectivity::{ConnectivityProbe, FixedConnectivity, TcpConnectivityProbe};
pub use db::{Database, LibSqlPostStore};
pub use error::{Error, ErrorKind, Result};
pub use models::{LocalPostRecord, Post, PostId};
pub use remote::{HttpRemoteSource, RemoteSource};
pub use store::{LocalStore, MemoryPostStore};
pub use sync::{FeedEvent, LikeToggle, LoadOutcome, LoadSource, PageOutcome, SyncEngine};
