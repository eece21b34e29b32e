use std::path::Path;

use postsync_core::util::normalize_text_option;
use postsync_core::{ClientConfig, PageFailurePolicy};

use crate::cli::ConfigCommands;
use crate::commands::common::{load_client_config, GlobalOptions};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            let config = load_client_config(options)?;
            println!("# {}", options.config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Init {
            api_url,
            probe_address,
            page_size,
            retry_failed_pages,
            persist_unsynced_likes,
        } => {
            let updates = ConfigUpdates {
                api_url: normalize_text_option(api_url),
                probe_address: normalize_text_option(probe_address),
                page_size,
                retry_failed_pages,
                persist_unsynced_likes,
            };
            let config = run_config_init(&options.config_path, updates)?;
            println!("Wrote {}", options.config_path.display());
            println!("API: {}", config.api_base_url);
            Ok(())
        }
    }
}

/// Values passed to `config init`; unset fields keep the current file's value
#[derive(Debug, Default)]
pub struct ConfigUpdates {
    pub api_url: Option<String>,
    pub probe_address: Option<String>,
    pub page_size: Option<u32>,
    pub retry_failed_pages: bool,
    pub persist_unsynced_likes: bool,
}

pub fn run_config_init(path: &Path, updates: ConfigUpdates) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::load_from_path(path)?;

    if let Some(url) = updates.api_url {
        config.api_base_url = url;
    }
    if let Some(address) = updates.probe_address {
        config.probe_address = Some(address);
    }
    if let Some(page_size) = updates.page_size {
        config.page_size = page_size;
    }
    if updates.retry_failed_pages {
        config.page_failure_policy = PageFailurePolicy::Retry;
    }
    if updates.persist_unsynced_likes {
        config.persist_unsynced_likes = true;
    }

    // Round-trip through the parser so an invalid file is never written
    let config = ClientConfig::parse(&serde_json::to_string(&config)?)
        .map_err(|error| CliError::Config(error.to_string()))?;
    config.save_to_path(path)?;
    Ok(config)
}
