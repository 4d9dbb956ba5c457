//! Build automation tasks for rawload
//!
//! Currently generates the CLI reference from the clap definitions.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for rawload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<rawload::Cli>();

    let content = format!(
        r#"# rawload CLI Reference

This documentation is generated from the CLI source code. Last updated: {}.

## Overview

rawload replaces the contents of PostgreSQL staging tables with the rows of
tab separated source files, one `TRUNCATE` + `COPY` per file, and verifies
that every table ended up with rows. A file that is missing or malformed
fails on its own; the rest of the batch still loads.

## Quick Start

```bash
# See which files would be loaded
rawload mappings

# Check the files are in place, without touching the database
rawload check --source-root data_lake/landing/archive

# Load everything
rawload load --source-root data_lake/landing/archive --db-name analytics
```

## Commands

{}

## Exit Status

| Code | Meaning |
|------|---------|
| 0 | Every entry loaded and verified |
| 1 | At least one entry failed; the others were still loaded |
| 2 | Fatal: bad configuration, missing source root, missing files in preflight, or no database connection |

## Environment Variables

- `RAWLOAD_CONFIG` - TOML configuration file
- `RAWLOAD_DB_HOST`, `RAWLOAD_DB_PORT`, `RAWLOAD_DB_NAME`, `RAWLOAD_DB_USER`, `RAWLOAD_DB_PASSWORD` - Connection settings
- `RAWLOAD_SOURCE_ROOT` - Directory holding the source files
- `RAWLOAD_COPY_MODE`, `RAWLOAD_SERVER_ROOT` - Where `COPY` reads files from
- `RAWLOAD_JOBS` - Number of tables loaded concurrently
- `LOG_LEVEL`, `LOG_FORMAT`, `LOG_OUTPUT`, `LOG_DIR`, `LOG_FILTER`, `RUST_LOG` - Logging

A `.env` file in the working directory is read at startup.

## Configuration

```toml
source_root = "data_lake/landing/archive"
jobs = 1

[database]
host = "localhost"
port = 5432
name = "analytics"
user = "postgres"

[copy]
mode = "client"

[[mappings]]
source = "title.basics.tsv"
table = "raw.title_basics"
```

When `[[mappings]]` are present they replace the built-in IMDb registry.

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
