use std::path::Path;

use postsync_core::store::LocalStore;
use postsync_core::Post;

use crate::commands::common::{open_database, print_posts};
use crate::error::CliError;

pub async fn run_cached(db_path: &Path, as_json: bool) -> Result<(), CliError> {
    let posts = cached_posts(db_path).await?;
    print_posts(&posts, as_json)
}

/// The stored snapshot in display order
pub async fn cached_posts(db_path: &Path) -> Result<Vec<Post>, CliError> {
    let db = open_database(db_path).await?;
    let records = db.post_store().fetch_all().await?;
    Ok(records.into_iter().map(Post::from).collect())
}
