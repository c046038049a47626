//! Build automation tasks for Tenderwatch
//!
//! Currently generates the Markdown CLI reference from the clap definitions.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for Tenderwatch", long_about = None)]
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

    let markdown = clap_markdown::help_markdown::<tenderwatch_ingest::cli::Cli>();

    let content = format!(
        r#"# tenderwatch-ingest CLI Reference

Generated from the CLI source code on {}.

## Overview

`tenderwatch-ingest` polls procurement registry order exports and prints the
orders published since the previous poll as JSON lines.

```bash
# First poll: every row of the export
tenderwatch-ingest sync --feed "http://zakupki.gov.ru/epz/order/orderCsvSettings/download.html?fz44=on=orders.csv"

# Download with any tool and pipe the body in
curl -s "$URL" | tenderwatch-ingest sync --feed "$URL=-"

# Check and repair the filter file
tenderwatch-ingest filter verify
tenderwatch-ingest filter clear

# Forget every checkpoint
tenderwatch-ingest cache clear
```

## Commands

{}

## Environment Variables

- `TENDERWATCH_CONFIG` - Configuration file (default: `config.json`)
- `TENDERWATCH_CACHE_FILE` - Checkpoint file (default: `cache.json`)
- `TENDERWATCH_FILTER_FILE` - Filter file (default: `filter.json`)
- `TENDERWATCH_FILTER_ENABLED` - Apply the filter (`true`/`false`)
- `TENDERWATCH_ENCODING` - Feed encoding (`windows-1251`, `utf-8`)
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` - Logging setup

## Filter File

```json
{{
  "All": ["(?i)ремонт"],
  "OrderName": [],
  "OKDP": ["^4520"],
  "OKPD": [],
  "OrganisationName": ["^Школа"]
}}
```

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
