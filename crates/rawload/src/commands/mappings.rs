//! `rawload mappings` command implementation

use crate::config::LoaderConfig;
use crate::error::FatalError;
use crate::outcome::EXIT_SUCCESS;
use crate::MappingsArgs;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use std::path::Path;

/// Print the resolved registry in load order
pub async fn run(config_path: Option<&Path>, args: &MappingsArgs) -> Result<i32, FatalError> {
    let config = LoaderConfig::load(config_path, args.overrides())?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["#", "Source", "Table"]);

    for (index, entry) in config.registry.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            entry.source_id().to_string(),
            entry.target_table().to_string(),
        ]);
    }

    println!("{}", table);
    println!("Source root: {}", config.source_root.display());

    Ok(EXIT_SUCCESS)
}
