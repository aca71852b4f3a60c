//! modx - browse and edit MODX elements from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Register a site
//! modx sites add --name main --base-url https://example.com --token secret
//!
//! # Browse, optionally filtered
//! modx tree --filter header
//!
//! # Read and write elements
//! modx cat modx:/main/modChunk/3/header.html
//! modx write modx:/main/modChunk/3/header.html --file header.html
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use modx_cli::logging::init_logging;
use modx_cli::{App, ConsoleNotifier, NewSite, SiteChanges, commands, output};
use modx_core::types::ContentType;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Parser)]
#[command(name = "modx")]
#[command(about = "Browse and edit MODX elements as files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configured sites
    #[command(subcommand)]
    Sites(SiteCommands),

    /// Print the site tree
    Tree {
        /// Only show this site
        #[arg(short, long)]
        site: Option<String>,

        /// Keep elements whose name or content contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show metadata of an element URI
    Stat { uri: String },

    /// Print element content
    Cat { uri: String },

    /// Save content to an element
    Write {
        uri: String,

        /// Read content from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Create an element
    New {
        site: String,

        /// modSnippet, modChunk, modTemplate, modPlugin (or snippet, chunk, ...)
        content_type: ContentType,

        name: String,
    },

    /// Rename an element
    Rename { uri: String, new_name: String },
}

#[derive(Subcommand)]
enum SiteCommands {
    /// List configured sites
    List,

    /// Add a site
    Add(AddSiteArgs),

    /// Change a site
    Edit(EditSiteArgs),

    /// Remove a site and its stored token
    Remove { name: String },

    /// Check that a site's API answers
    Ping { name: String },
}

#[derive(Args)]
struct AddSiteArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    base_url: String,

    /// API endpoint, absolute or relative to the base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Content types to show (comma separated; default all)
    #[arg(long, value_delimiter = ',')]
    elements: Option<Vec<ContentType>>,

    /// Bearer token
    #[arg(long, env = "MODX_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Args)]
struct EditSiteArgs {
    /// Site to change
    site: String,

    /// New name
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    api_url: Option<String>,

    #[arg(long, value_delimiter = ',')]
    elements: Option<Vec<ContentType>>,

    /// New bearer token; pass an empty value to remove it
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::error(format!("{:#}", e));
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref()).await?;
    init_logging(cli.verbose, &config.general.log_level);

    let app = App::new(config, Arc::new(ConsoleNotifier))?;

    match cli.command {
        Commands::Sites(site_cmd) => match site_cmd {
            SiteCommands::List => print_sites(&app).await?,
            SiteCommands::Add(args) => {
                let site = commands::sites_add(
                    &app,
                    NewSite {
                        name: args.name,
                        base_url: args.base_url,
                        api_url: args.api_url,
                        elements: args.elements,
                        token: args.token,
                    },
                )
                .await?;
                output::success(format!("Added site: {}", site.name));
            }
            SiteCommands::Edit(args) => {
                let site = commands::sites_edit(
                    &app,
                    &args.site,
                    SiteChanges {
                        name: args.name,
                        base_url: args.base_url,
                        api_url: args.api_url,
                        elements: args.elements,
                        token: args.token,
                    },
                )
                .await?;
                output::success(format!("Updated site: {}", site.name));
            }
            SiteCommands::Remove { name } => {
                let site = commands::sites_remove(&app, &name).await?;
                output::success(format!("Removed site: {}", site.name));
            }
            SiteCommands::Ping { name } => {
                let (endpoint, status) = commands::sites_ping(&app, &name).await?;
                output::info(format!("{} answered with HTTP {}", endpoint, status));
            }
        },

        Commands::Tree { site, filter } => {
            let tree = app.tree();
            if let Some(query) = filter {
                tree.set_filter(query);
            }
            let lines = commands::collect_tree(&tree, site.as_deref()).await?;
            if tree.no_sites_configured() {
                output::warning("No sites configured. Add one with `modx sites add`.");
            }
            for line in lines {
                let indent = "  ".repeat(line.depth);
                let label = output::render_label(&line.label);
                match line.detail {
                    Some(detail) => println!("{}{}  {}", indent, label, style(detail).dim()),
                    None => println!("{}{}", indent, label),
                }
            }
        }

        Commands::Stat { uri } => {
            let stat = commands::stat(&app, &uri).await?;
            output::kv("type", format!("{:?}", stat.file_type).to_lowercase());
            output::kv("size", stat.size);
            output::kv("ctime", stat.ctime);
            output::kv("mtime", stat.mtime);
        }

        Commands::Cat { uri } => {
            let content = commands::cat(&app, &uri).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content).await?;
            stdout.flush().await?;
        }

        Commands::Write { uri, file } => {
            let content = match file {
                Some(path) => tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = Vec::new();
                    tokio::io::stdin()
                        .read_to_end(&mut buf)
                        .await
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            commands::write(&app, &uri, &content).await?;
            output::success(format!("Saved {}", uri));
        }

        Commands::New {
            site,
            content_type,
            name,
        } => {
            let node = commands::create(&app, &site, content_type, &name).await?;
            output::success(format!("Created {} {}", content_type.noun(), node.element.name));
            println!("{}", node.uri());
        }

        Commands::Rename { uri, new_name } => {
            let renamed = commands::rename(&app, &uri, &new_name).await?;
            println!("{}", renamed);
        }
    }

    Ok(())
}

async fn print_sites(app: &App) -> Result<()> {
    let sites = commands::sites_list(app).await?;
    if sites.is_empty() {
        output::info("No sites configured");
        return Ok(());
    }

    for site in sites {
        output::header(&site.name);
        output::kv("base url", &site.base_url);
        output::kv("api", modx_remote::api_base(&site));
        let types: Vec<&str> = site.enabled_types().iter().map(|t| t.as_str()).collect();
        output::kv("elements", types.join(", "));
        output::kv(
            "token",
            if site.token_key.is_some() { "stored" } else { "none" },
        );
    }
    Ok(())
}
