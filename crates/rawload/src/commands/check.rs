//! `rawload check` command implementation
//!
//! Reports which mapped source files are present. Never connects to the
//! database.

use crate::availability;
use crate::config::LoaderConfig;
use crate::error::FatalError;
use crate::outcome::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::CheckArgs;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use rawload_common::types::format_bytes;
use std::path::Path;

/// Check every mapped source file
pub async fn run(config_path: Option<&Path>, args: &CheckArgs) -> Result<i32, FatalError> {
    let config = LoaderConfig::load(config_path, args.overrides())?;

    availability::require_dir(&config.source_root).await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Source", "Table", "Size", "Status"]);

    let total = config.registry.len();
    let mut present = 0;
    for entry in &config.registry {
        let (size, status) = match availability::check(&config.source_path(entry)).await {
            Ok(bytes) => {
                present += 1;
                (format_bytes(bytes), "present".to_string())
            },
            Err(reason) => ("-".to_string(), reason.to_string()),
        };
        table.add_row(vec![
            entry.source_id().to_string(),
            entry.target_table().to_string(),
            size,
            status,
        ]);
    }

    println!("{}", table);
    println!();

    let line = format!("{}/{} source files available", present, total);
    if present == total {
        println!("{}", line.green());
        Ok(EXIT_SUCCESS)
    } else {
        println!("{}", line.red());
        Ok(EXIT_FAILURE)
    }
}
