//! Database layer for postsync

mod connection;
mod migrations;
mod post_store;

pub use connection::Database;
pub use post_store::LibSqlPostStore;
