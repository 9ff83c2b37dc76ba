use anyhow::{Result, anyhow};
use clap::Parser;
use deghiblify::classify::classify_error;
use deghiblify::cli::OpenAiOptions;
use deghiblify::config::{load_dotenv, setup_logging};
use deghiblify::oneshot::deghiblify_file;
use std::path::PathBuf;

/// Turn one anime-style character image into a photorealistic portrait.
///
/// Minimal UX:
///   deghiblify_image ./totoro.png
#[derive(Parser, Debug)]
#[command(name = "deghiblify_image")]
#[command(about = "Describe an anime character with a vision model, then render it as a real person")]
struct Args {
    /// Source image (jpg, png, gif, bmp)
    image: PathBuf,

    /// Output directory; the result is saved as <dir>/<prefix>_<name>_<timestamp>.<ext>
    #[arg(long, default_value = "./output", env = "DEGHIBLIFY_OUTPUT_DIR")]
    out_dir: PathBuf,

    /// Print the intermediate URL as well as the saved path
    #[arg(long, env = "DEGHIBLIFY_DEBUG")]
    debug: bool,

    #[command(flatten)]
    openai: OpenAiOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    match deghiblify_file(&args.openai, &args.image, &args.out_dir).await {
        Ok(saved) => {
            if args.debug {
                eprintln!("Generated image URL: {}", saved.reference);
            }
            println!("Saved: {}", saved.path.display());
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", classify_error(&err));
            Err(anyhow!(err))
        }
    }
}
