//! Menu shown when `seqfetch` is run without a subcommand.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use seqfetch_api_models::ItemCode;
use seqfetch_cli_utils::MultiProgress;
use seqfetch_sync::config::{DEFAULT_DATA_DIR, DEFAULT_MAX_PER_RUN, parse_cutoff};
use seqfetch_sync::report::DEFAULT_OUT_PREFIX;

use crate::commands::{self, Overrides};

enum Action {
    AutoFetch,
    Download,
    ListReady,
    Intro,
}

impl Action {
    const ALL: &[Self] = &[Self::AutoFetch, Self::Download, Self::ListReady, Self::Intro];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::AutoFetch => "Fetch newly completed items",
            Self::Download => "Download a single item",
            Self::ListReady => "Write ready items to CSV",
            Self::Intro => "API tour",
        }
    }
}

/// Prompts for an action and its settings, then runs it.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read or the selected
/// command fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("seqfetch");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::AutoFetch => {
            let max_str: String = Input::new()
                .with_prompt("Maximum items this run")
                .default(DEFAULT_MAX_PER_RUN.to_string())
                .interact_text()?;
            let after: String = Input::new()
                .with_prompt("Completed after (RFC 3339 or YYYY-MM-DD, blank for default)")
                .allow_empty(true)
                .interact_text()?;

            let overrides = Overrides {
                data_dir: Some(prompt_data_dir()?),
                max_per_run: Some(max_str.trim().parse()?),
                after: if after.trim().is_empty() {
                    None
                } else {
                    Some(parse_cutoff(&after)?)
                },
                keep_archives: prompt_keep_archives()?,
                ledger: None,
            };
            commands::auto_fetch(multi, None, &overrides).await?;
        }
        Action::Download => {
            let code: String = Input::new()
                .with_prompt("Item code")
                .validate_with(|input: &String| {
                    input
                        .trim()
                        .parse::<ItemCode>()
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()?;
            let code: ItemCode = code.trim().parse()?;

            let overrides = Overrides {
                data_dir: Some(prompt_data_dir()?),
                keep_archives: prompt_keep_archives()?,
                ..Overrides::default()
            };
            commands::download(multi, &code, &overrides).await?;
        }
        Action::ListReady => {
            let prefix: String = Input::new()
                .with_prompt("Output prefix")
                .default(DEFAULT_OUT_PREFIX.to_string())
                .interact_text()?;
            commands::list_ready(&prefix, None, &Overrides::default()).await?;
        }
        Action::Intro => {
            let overrides = Overrides {
                data_dir: Some(prompt_data_dir()?),
                ..Overrides::default()
            };
            commands::intro(multi, &overrides).await?;
        }
    }

    Ok(())
}

fn prompt_data_dir() -> Result<PathBuf, dialoguer::Error> {
    let dir: String = Input::new()
        .with_prompt("Data directory")
        .default(DEFAULT_DATA_DIR.to_string())
        .interact_text()?;
    Ok(PathBuf::from(dir))
}

fn prompt_keep_archives() -> Result<bool, dialoguer::Error> {
    Confirm::new()
        .with_prompt("Keep zip files after extraction?")
        .default(false)
        .interact()
}
