//! Data models for postsync

mod post;

pub use post::{LocalPostRecord, Post, PostId};
