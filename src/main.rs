use clap::Parser;
use deckhand::utils::logger;
use deckhand::{ChatterBackend, Deck, LiquidHandler, PlatformConfig, RailDeckConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "deckhand")]
#[command(about = "Import a robot deck layout and dry-run it on a simulated backend")]
struct Args {
    /// Vendor layout file to import
    layout: PathBuf,

    /// Platform geometry TOML; defaults to the 30 rail deck
    #[arg(long)]
    platform: Option<PathBuf>,

    /// Pipetting channels on the simulated backend
    #[arg(long, default_value = "8")]
    channels: usize,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting deckhand CLI");
    if args.verbose {
        tracing::debug!("args: {:?}", args);
    }

    if let Err(e) = run(args).await {
        tracing::error!("Layout import failed: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> deckhand::Result<()> {
    let deck = match &args.platform {
        Some(path) => {
            let config = PlatformConfig::from_file(path)?;
            config.validate()?;
            match config {
                PlatformConfig::Rails(rails) => Deck::rails(rails)?,
                PlatformConfig::Slots(slots) => Deck::slots(slots)?,
            }
        }
        None => Deck::rails(RailDeckConfig::star())?,
    };

    let backend = ChatterBackend::with_channels(args.channels);
    let mut handler = LiquidHandler::new(deck, backend);

    handler.load_layout_file(&args.layout).await?;
    handler.setup().await?;
    println!("{}", handler.summary()?);
    handler.stop().await?;
    Ok(())
}
