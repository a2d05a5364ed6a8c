use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::imaging::{render_thumbnail, WatermarkPosition, THUMBNAIL_SIZE};

#[derive(Args, Debug)]
pub struct ThumbnailArgs {
    #[arg(help = "Source image file")]
    pub input: PathBuf,

    #[arg(help = "Where to write the JPEG")]
    pub output: PathBuf,

    #[arg(long, default_value_t = THUMBNAIL_SIZE, help = "Longest side in pixels")]
    pub size: u32,

    #[arg(long, help = "Watermark image to overlay")]
    pub watermark: Option<PathBuf>,

    #[arg(long, default_value = "middle-center", help = "middle-center or bottom-right")]
    pub position: WatermarkPosition,

    #[arg(long, default_value_t = 75, help = "JPEG quality (1-100)")]
    pub quality: u8,
}

pub async fn handle(args: ThumbnailArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let source = tokio::fs::read(&args.input).await?;
    let mark = match &args.watermark {
        Some(path) => Some(image::open(path)?.to_rgba8()),
        None => None,
    };

    let size = args.size;
    let position = args.position;
    let quality = args.quality;
    let jpeg = tokio::task::spawn_blocking(move || render_thumbnail(&source, size, mark.as_ref(), position, quality))
        .await??;

    tokio::fs::write(&args.output, &jpeg).await?;
    tracing::debug!(output = %args.output.display(), bytes = jpeg.len(), "thumbnail written");

    output_success(
        &output_format,
        &format!("Wrote {}", args.output.display()),
        Some(json!({
            "output": args.output,
            "bytes": jpeg.len(),
            "size": size,
            "position": position.as_str(),
        })),
    )
}
