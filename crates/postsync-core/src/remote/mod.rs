//! Remote page source for the post feed

mod http;

pub use http::HttpRemoteSource;

use crate::error::Result;
use crate::models::Post;

/// A source of canonical post pages
///
/// Pages are 1-based. Implementations must not have side effects and should
/// report transport failures as [`crate::Error::Transport`] and malformed
/// payloads as [`crate::Error::Decode`].
#[allow(async_fn_in_trait)]
pub trait RemoteSource {
    /// Fetch one page of posts
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<Post>>;
}
