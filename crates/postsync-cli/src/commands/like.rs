use crate::commands::common::{open_session, parse_post_id, GlobalOptions};
use crate::error::CliError;

pub async fn run_like(options: &GlobalOptions, id: &str) -> Result<(), CliError> {
    let id = parse_post_id(id)?;
    let session = open_session(options).await?;
    session.engine.load().await?;

    let toggle = session
        .engine
        .toggle_like(id)
        .await
        .ok_or_else(|| CliError::PostNotFound(id.to_string()))?;

    let verb = if toggle.is_liked { "Liked" } else { "Unliked" };
    println!("{verb} post {id}");
    if !toggle.persisted {
        let reason = session
            .engine
            .last_error()
            .await
            .unwrap_or_else(|| "unknown error".to_string());
        eprintln!("Warning: like not saved: {reason}");
    }

    Ok(())
}
