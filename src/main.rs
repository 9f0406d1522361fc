// ABOUTME: CLI entrypoint for mdnotion command
// ABOUTME: Handles error exit codes, logging setup, and command dispatch

use clap::Parser;
use mdnotion::{
    api::NotionClient,
    cli::{Cli, Commands},
    config::{load_env_file, resolve_credentials, Credentials, PropertySchema},
    link::{link_file, LinkOutcome},
    pull::pull_all,
    schema::ensure_schema,
    storage::{discover_markdown, SourceDocument},
    sync::{sync_files, SyncOptions},
    Result,
};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("mdnotion: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn build_client(cli: &Cli, creds: &Credentials) -> Result<NotionClient> {
    let mut client = NotionClient::new(creds.api_key.clone(), Some(cli.api_base.clone()))?;
    if cli.no_throttle {
        client = client.disable_throttle();
    } else if let Some(rate) = cli.rate {
        client = client.with_rate(rate);
    }
    Ok(client)
}

fn load_schema(cli: &Cli) -> Result<PropertySchema> {
    match &cli.schema {
        Some(path) => PropertySchema::load(path),
        None => Ok(PropertySchema::default()),
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    load_env_file(cli.env_file.as_deref())?;

    match cli.command() {
        Commands::Convert { file, output } => {
            let doc = SourceDocument::load(&file)?;
            let yaml = serde_yaml::to_string(&doc.frontmatter)?;
            eprintln!("--- Front matter ---\n{}", yaml);

            let blocks = cli.converter.convert(&doc.body);
            let json = serde_json::to_string_pretty(&blocks)?;
            std::fs::write(&output, json)?;
            println!(
                "Converted {} blocks. Output saved to {}",
                blocks.len(),
                output.display()
            );
        }
        Commands::Push { files } => {
            let creds = resolve_credentials(cli.api_key.clone(), cli.database_id.clone())?;
            let client = build_client(&cli, &creds)?;

            let files: Vec<PathBuf> = if files.is_empty() {
                discover_markdown(&cli.roots)
            } else {
                files
            };
            if files.is_empty() {
                println!("No markdown files to sync.");
                return Ok(());
            }

            let opts = SyncOptions {
                schema: load_schema(&cli)?,
                converter: cli.converter,
                resolution: cli.resolve,
                inline_children: !cli.no_inline_children,
                ..SyncOptions::new(creds.database_id.clone())
            };

            log::info!("Starting Notion sync for {} file(s)", files.len());
            let report = sync_files(&client, &opts, &files);
            println!(
                "Notion sync finished: {} created, {} updated, {} skipped, {} failed",
                report.created,
                report.updated,
                report.skipped,
                report.failed.len()
            );
        }
        Commands::Pull => {
            let creds = resolve_credentials(cli.api_key.clone(), cli.database_id.clone())?;
            let client = build_client(&cli, &creds)?;
            let repo_root = std::env::current_dir()?;

            let files = discover_markdown(&cli.roots);
            let report = pull_all(&client, &repo_root, &files);
            println!(
                "Notion pull finished: {} written, {} skipped, {} failed",
                report.written.len(),
                report.skipped,
                report.failed.len()
            );
        }
        Commands::Schema => {
            let creds = resolve_credentials(cli.api_key.clone(), cli.database_id.clone())?;
            let client = build_client(&cli, &creds)?;

            let added = ensure_schema(&client, &creds.database_id, &load_schema(&cli)?)?;
            if added.is_empty() {
                println!("Database schema already has every required property.");
            } else {
                println!("Added properties: {}", added.join(", "));
            }
        }
        Commands::Link { file, directory } => {
            let creds = resolve_credentials(cli.api_key.clone(), cli.database_id.clone())?;
            let client = build_client(&cli, &creds)?;

            match link_file(&client, &creds.database_id, &load_schema(&cli)?, &file, &directory)? {
                LinkOutcome::AlreadyLinked => {
                    println!("{} is already linked to Notion.", file.display());
                }
                LinkOutcome::Linked { page_id } => {
                    println!("Linked {} to Notion page {}", file.display(), page_id);
                }
            }
        }
    }

    Ok(())
}
