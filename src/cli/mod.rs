pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "collections")]
#[command(about = "Collections Online CLI - offline thumbnails, sitemaps and tag suggestions")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Render a local image file into a thumbnail")]
    Thumbnail(commands::thumbnail::ThumbnailArgs),

    #[command(about = "Print sitemap XML")]
    Sitemap {
        #[command(subcommand)]
        cmd: commands::sitemap::SitemapCommands,
    },

    #[command(about = "Motif tag suggestions")]
    Tags {
        #[command(subcommand)]
        cmd: commands::tags::TagsCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Thumbnail(args) => commands::thumbnail::handle(args, output_format).await,
        Commands::Sitemap { cmd } => commands::sitemap::handle(cmd, output_format).await,
        Commands::Tags { cmd } => commands::tags::handle(cmd, output_format).await,
    }
}
