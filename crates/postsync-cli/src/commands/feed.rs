use postsync_core::{LoadOutcome, LoadSource, PageOutcome};

use crate::commands::common::{open_session, print_posts, CliEngine, GlobalOptions};
use crate::error::CliError;

pub async fn run_list(options: &GlobalOptions, as_json: bool) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let outcome = session.engine.load().await?;
    report_outcome(&outcome);
    print_posts(&session.engine.posts().await, as_json)
}

pub async fn run_refresh(options: &GlobalOptions, as_json: bool) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let outcome = session.engine.refresh().await?;
    report_outcome(&outcome);
    print_posts(&session.engine.posts().await, as_json)
}

pub async fn run_browse(options: &GlobalOptions, pages: u32, as_json: bool) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let outcome = session.engine.load().await?;
    report_outcome(&outcome);

    if outcome.source == LoadSource::Remote {
        browse_pages(&session.engine, pages).await;
    } else if pages > 0 {
        eprintln!("Offline: showing cached posts only");
    }

    print_posts(&session.engine.posts().await, as_json)
}

/// Fetch up to `pages` further pages, stopping at the first failure or empty page
pub async fn browse_pages(engine: &CliEngine, pages: u32) -> u32 {
    let mut fetched = 0;
    for _ in 0..pages {
        match engine.load_next_page().await {
            Ok(PageOutcome::Appended { page, added }) => {
                tracing::debug!("Page {page} added {added} posts");
                fetched += 1;
                if added == 0 {
                    break;
                }
            }
            Ok(outcome) => {
                tracing::debug!("Stopped paging: {outcome:?}");
                break;
            }
            Err(error) => {
                eprintln!("Warning: stopped paging: {error}");
                break;
            }
        }
    }
    fetched
}

fn report_outcome(outcome: &LoadOutcome) {
    if outcome.source == LoadSource::Local {
        eprintln!("Offline: showing {} cached posts", outcome.posts);
    }
    if !outcome.persisted {
        eprintln!("Warning: posts were loaded but could not be cached");
    }
}
