use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::config;
use crate::services::Elasticsearch;
use crate::sitemap::{catalog_query, index_query, parse_catalog_buckets, render_index, render_urlset};

#[derive(Subcommand)]
pub enum SitemapCommands {
    #[command(about = "Print the sitemap index")]
    Index {
        #[arg(long, help = "Host the sitemap is served from")]
        host: String,
    },

    #[command(about = "Print one page of a catalog sitemap")]
    Catalog {
        #[arg(help = "Catalog name")]
        catalog: String,

        #[arg(long, help = "Host the sitemap is served from")]
        host: String,

        #[arg(long, default_value_t = 0, help = "Sitemap page (0-based)")]
        offset: u64,
    },
}

pub async fn handle(cmd: SitemapCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config()?;
    let es = Elasticsearch::new(reqwest::Client::new(), &config.elasticsearch.url);
    let index = &config.elasticsearch.assets_index;
    let scheme = &config.sitemap.scheme;

    let xml = match cmd {
        SitemapCommands::Index { host } => {
            let response = es.search(index, &index_query()).await?;
            let buckets = response
                .aggregations
                .as_ref()
                .map(parse_catalog_buckets)
                .unwrap_or_default();
            render_index(scheme, &host, &buckets, config.sitemap.asset_limit)
        }
        SitemapCommands::Catalog { catalog, host, offset } => {
            let response = es
                .search(index, &catalog_query(&catalog, offset, config.sitemap.asset_limit))
                .await?;
            let sources: Vec<_> = response.hits.hits.into_iter().map(|hit| hit.source).collect();
            render_urlset(scheme, &host, &sources, config)
        }
    };

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "xml": xml }))?),
        OutputFormat::Text => println!("{}", xml),
    }
    Ok(())
}
