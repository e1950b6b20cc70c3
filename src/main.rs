use std::path::{Path, PathBuf};

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use somify::config::{block_width_candidates, derive_block_height, DEFAULT_ALPHA, DEFAULT_EPOCHS};
use somify::utils::{load_raster, plot_training_curve, save_raster};
use somify::{compress, CompressionConfig};

/// SOMify Image Compressor
#[derive(Parser)]
#[command(name = "somify")]
#[command(about = "Lossy image compression with a self-organizing map codebook", long_about = None)]
struct Cli {
    /// Path to the input image
    #[arg(short, long)]
    image_path: PathBuf,

    /// Number of bits per codevector (1-24)
    #[arg(short, long, required_unless_present = "list_block_widths")]
    bits_per_codevector: Option<u32>,

    /// Width of the image blocks
    #[arg(short = 'w', long, required_unless_present = "list_block_widths")]
    block_width: Option<usize>,

    /// Number of epochs for training the SOM
    #[arg(short, long, default_value_t = DEFAULT_EPOCHS)]
    epochs: usize,

    /// Initial learning rate for the SOM
    #[arg(short, long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,

    /// Convert the image to grayscale before compression
    #[arg(short, long)]
    grayscale: bool,

    /// Output path (default: output/SOMify-<block width>-<input name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for codebook initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Write a PNG chart of the training curve
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Print the block widths that tile the image and exit
    #[arg(long)]
    list_block_widths: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_raster(&cli.image_path)?;

    if cli.list_block_widths {
        for w in block_width_candidates(image.width(), image.height()) {
            println!("{}", w);
        }
        return Ok(());
    }

    // clap が required_unless_present を保証する
    let (Some(bits), Some(block_width)) = (cli.bits_per_codevector, cli.block_width) else {
        return Err("--bits-per-codevector and --block-width are required".into());
    };

    let block_height = derive_block_height(block_width, image.width(), image.height())?;
    let config = CompressionConfig::new(block_width, block_height, bits)
        .with_epochs(cli.epochs)
        .with_alpha(cli.alpha)
        .with_grayscale(cli.grayscale);

    let mut rng = match cli.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    info!(block_width, block_height, bits, "starting compression");
    let result = compress(&image, &config, &mut rng)?;

    let output = match &cli.output {
        Some(path) => path.clone(),
        None => default_output_path(&cli.image_path, block_width),
    };
    if let Some(dir) = output.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    save_raster(&output, &result.image)?;
    info!(path = %output.display(), "saved compressed image");

    if let Some(plot) = &cli.plot {
        plot_training_curve(&plot.to_string_lossy(), &result.epochs)?;
    }

    println!("Mean Square Error = {}", result.mse);
    Ok(())
}

fn default_output_path(input: &Path, block_width: usize) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.png".to_string());
    Path::new("output").join(format!("SOMify-{}-{}", block_width, name))
}
