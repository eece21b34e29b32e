pub mod cached;
pub mod common;
pub mod completions;
pub mod config;
pub mod feed;
pub mod like;
