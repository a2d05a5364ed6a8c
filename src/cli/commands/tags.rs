use clap::Subcommand;

use crate::cli::utils::output_list;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::services::{GoogleVision, OxfordVision, Translator};
use crate::tagging::{SuggestionApis, TagSuggester};

#[derive(Subcommand)]
pub enum TagsCommands {
    #[command(about = "Suggest translated motif tags for an image")]
    Suggest {
        #[arg(help = "Publicly reachable image URL")]
        image_url: String,

        #[arg(long, help = "Skip the Oxford vision service")]
        google_only: bool,
    },
}

pub async fn handle(cmd: TagsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config()?;
    let http = reqwest::Client::new();

    match cmd {
        TagsCommands::Suggest { image_url, google_only } => {
            let google = GoogleVision::new(
                http.clone(),
                &config.google.vision_url,
                &config.google.api_key,
                config.tagging.max_google_suggestions,
            );
            let oxford = config
                .oxford
                .as_ref()
                .map(|oxford| OxfordVision::new(http.clone(), &oxford.endpoint, &oxford.api_key));
            let translator = Translator::new(http.clone(), &config.google.translate_url, &config.google.api_key);
            let suggester = TagSuggester::new(google, oxford, translator, config.tagging.clone());

            let apis = SuggestionApis {
                google: true,
                oxford: !google_only,
            };
            let tags = suggester.fetch_suggestions(&image_url, apis).await?;
            output_list(&output_format, "tags", &tags)
        }
    }
}
