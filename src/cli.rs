// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines all subcommands and global flags

use crate::convert::Converter;
use crate::link::DEFAULT_DIRECTORY;
use crate::sync::Resolution;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mdnotion")]
#[command(about = "Sync markdown documents with a Notion database", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Notion integration token (overrides NOTION_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Target database id (overrides NOTION_DATABASE_ID)
    #[arg(long, global = true)]
    pub database_id: Option<String>,

    /// API base URL
    #[arg(long, global = true, default_value = "https://api.notion.com")]
    pub api_base: String,

    /// Directories scanned when no files are given (repeatable)
    #[arg(long = "root", global = true, default_values = ["articles", "content"])]
    pub roots: Vec<PathBuf>,

    /// Env file to load instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// YAML file mapping Notion property names
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Markdown converter
    #[arg(long, global = true, value_enum, default_value_t = Converter::Rich)]
    pub converter: Converter,

    /// How existing pages are located
    #[arg(long, global = true, value_enum, default_value_t = Resolution::Auto)]
    pub resolve: Resolution,

    /// Append every block after creating the page instead of sending the first batch inline
    #[arg(long, global = true)]
    pub no_inline_children: bool,

    /// Request rate limit (requests per second)
    #[arg(long, global = true, value_parser = parse_rate)]
    pub rate: Option<f64>,

    /// Disable rate limiting (not recommended)
    #[arg(long, global = true)]
    pub no_throttle: bool,
}

fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|_| "Invalid rate value")?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err("rate must be > 0".into());
    }
    Ok(rate)
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Push markdown files to Notion (default)
    Push {
        /// Files to sync; scans the roots when omitted
        files: Vec<PathBuf>,
    },

    /// Pull Notion page content back into markdown files
    Pull,

    /// Add the properties sync needs to the database
    Schema,

    /// Create a placeholder page for a file and mark it for sync
    Link {
        file: PathBuf,

        /// Directory pulled content is written to
        #[arg(long, default_value = DEFAULT_DIRECTORY)]
        directory: String,
    },

    /// Convert a file to Notion blocks and write them as JSON
    Convert {
        file: PathBuf,

        #[arg(long, default_value = "output.json")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Push { files: Vec::new() })
    }
}
