//! jp2codec CLI - encode, decode and inspect wavelet codestreams.

use clap::{Parser, Subcommand, ValueEnum};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use jp2codec::constants::{
    DEFAULT_DECOMPOSITION_LEVELS, DEFAULT_TILE_SIZE, DEFAULT_VISUAL_QUALITY,
};
use jp2codec::jp2::codestream::CodestreamReader;
use jp2codec::{
    EncoderOptions, Jp2Decoder, Jp2Encoder, PixelFormat, RasterImage, WaveletKernel, metrics,
    preprocess,
};

/// Wavelet image codec with a visual quality knob
#[derive(Parser)]
#[command(name = "jp2codec")]
#[command(version)]
#[command(about = "Encode, decode and inspect wavelet codestreams", long_about = None)]
#[command(after_help = "EXAMPLES:
    jp2codec encode -i photo.jpg -o photo.jp2c -q 60
    jp2codec encode -i scan.png -o scan.jp2c -q 100 --grayscale
    jp2codec decode -i photo.jp2c -o photo.png
    jp2codec info -i photo.jp2c
    jp2codec compare -i photo.jpg --width 140 -q 50 -o preview.png

Set RUST_LOG=jp2codec=trace for per-tile detail.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log codec activity (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a PNG, JPEG or PNM image
    #[command(visible_alias = "e")]
    Encode {
        /// Input image (PNG, JPEG, PGM/PPM)
        #[arg(short, long)]
        input: PathBuf,

        /// Output codestream
        #[arg(short, long)]
        output: PathBuf,

        /// Visual quality, 0 (smallest) to 100 (finest)
        #[arg(short, long, default_value_t = DEFAULT_VISUAL_QUALITY)]
        quality: f32,

        /// Wavelet decomposition levels
        #[arg(short, long, default_value_t = DEFAULT_DECOMPOSITION_LEVELS)]
        levels: u8,

        /// Wavelet kernel
        #[arg(short, long, default_value = "reversible", value_enum)]
        kernel: Kernel,

        /// Tile width in pixels
        #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
        tile_width: u32,

        /// Tile height in pixels
        #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
        tile_height: u32,

        /// Resize to this width first, keeping the aspect ratio
        #[arg(long)]
        resize_width: Option<u32>,

        /// Convert to grayscale first
        #[arg(short, long)]
        grayscale: bool,

        /// Comment stored in the codestream
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Decode a codestream to an image file or raw samples
    #[command(visible_alias = "d")]
    Decode {
        /// Input codestream
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "png", value_enum)]
        format: OutputFormat,
    },

    /// Show the header and tile layout of a codestream
    #[command(visible_alias = "i")]
    Info {
        /// Input codestream
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Resize, convert to grayscale and round-trip a photo, reporting sizes
    #[command(visible_alias = "c")]
    Compare {
        /// Input image (PNG, JPEG, PGM/PPM)
        #[arg(short, long)]
        input: PathBuf,

        /// Width to resize to before encoding
        #[arg(short, long, default_value_t = 140)]
        width: u32,

        /// Visual quality, 0 (smallest) to 100 (finest)
        #[arg(short, long, default_value_t = 50.0)]
        quality: f32,

        /// Write the decoded image here (PNG)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kernel {
    /// Integer 5/3, lossless at quality 100
    Reversible,
    /// CDF 9/7
    Irreversible,
}

impl From<Kernel> for WaveletKernel {
    fn from(kernel: Kernel) -> Self {
        match kernel {
            Kernel::Reversible => WaveletKernel::Reversible53,
            Kernel::Irreversible => WaveletKernel::Irreversible97,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Portable Network Graphics
    Png,
    /// PGM for grayscale, PPM for RGB
    Pnm,
    /// Interleaved 8-bit samples, no header
    Raw,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            quality,
            levels,
            kernel,
            tile_width,
            tile_height,
            resize_width,
            grayscale,
            comment,
        } => {
            let options = EncoderOptions {
                visual_quality: quality,
                decomposition_levels: levels,
                kernel: kernel.into(),
                tile_width,
                tile_height,
                comment,
            };
            encode_image(&input, &output, options, resize_width, grayscale)
        }
        Commands::Decode {
            input,
            output,
            format,
        } => decode_image(&input, &output, format),
        Commands::Info { input } => show_info(&input),
        Commands::Compare {
            input,
            width,
            quality,
            output,
        } => compare(&input, width, quality, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_image(path: &Path) -> Result<RasterImage, Box<dyn std::error::Error>> {
    let image = image::open(path)?;
    let raster = if image.color().has_color() {
        let rgb = image.to_rgb8();
        RasterImage::new(rgb.width(), rgb.height(), PixelFormat::Rgb8, rgb.into_raw())?
    } else {
        let gray = image.to_luma8();
        RasterImage::new(gray.width(), gray.height(), PixelFormat::Gray8, gray.into_raw())?
    };
    Ok(raster)
}

fn color_type(format: PixelFormat) -> ExtendedColorType {
    match format {
        PixelFormat::Gray8 => ExtendedColorType::L8,
        PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
    }
}

fn save_image(
    path: &Path,
    image: &RasterImage,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Png => image::save_buffer_with_format(
            path,
            image.samples(),
            image.width(),
            image.height(),
            color_type(image.format()),
            ImageFormat::Png,
        )?,
        OutputFormat::Pnm => {
            let subtype = match image.format() {
                PixelFormat::Gray8 => PnmSubtype::Graymap(SampleEncoding::Binary),
                PixelFormat::Rgb8 => PnmSubtype::Pixmap(SampleEncoding::Binary),
            };
            let writer = BufWriter::new(File::create(path)?);
            PnmEncoder::new(writer).with_subtype(subtype).write_image(
                image.samples(),
                image.width(),
                image.height(),
                color_type(image.format()),
            )?
        }
        OutputFormat::Raw => fs::write(path, image.samples())?,
    }
    Ok(())
}

fn encode_image(
    input: &Path,
    output: &Path,
    options: EncoderOptions,
    resize_width: Option<u32>,
    grayscale: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut image = load_image(input)?;
    if let Some(width) = resize_width {
        image = preprocess::resize_by_width(&image, width)?;
    }
    if grayscale {
        image = preprocess::to_grayscale(&image)?;
    }

    let encoded = Jp2Encoder::with_options(&image, options).encode()?;
    fs::write(output, &encoded)?;
    println!(
        "✓ Encoded {}x{} image ({} channels) to {:?}: {} bytes",
        image.width(),
        image.height(),
        image.channels(),
        output,
        encoded.len()
    );
    Ok(())
}

fn decode_image(
    input: &Path,
    output: &Path,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let image = Jp2Decoder::new(&data).decode()?;
    save_image(output, &image, format)?;
    println!(
        "✓ Decoded {}x{} image ({} channels) to {:?}",
        image.width(),
        image.height(),
        image.channels(),
        output
    );
    Ok(())
}

fn show_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();

    let mut stream = CodestreamReader::new(&data)?;
    let header = stream.header().clone();
    println!("  Dimensions: {}x{}", header.width, header.height);
    println!("  Channels:   {}", header.format.channels());
    println!("  Tile size:  {}x{}", header.tile_width, header.tile_height);
    println!("  Kernel:     {:?}", header.kernel);
    println!("  Transform:  {:?}", header.component_transform);
    println!("  DWT levels: {}", header.levels());
    let steps = header.plan.steps();
    let (min, max) = steps
        .iter()
        .fold((f32::INFINITY, 0.0f32), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    println!("  Steps:      {} ({:.3} .. {:.3})", steps.len(), min, max);
    if let Some(comment) = &header.comment {
        println!("  Comment:    {}", comment);
    }
    println!();
    while let Some(tile) = stream.next_tile()? {
        let rect = &tile.rect;
        println!(
            "  Tile {:>4}: {}x{} at ({}, {}), {} levels, {} bytes",
            rect.index,
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            header.tile_levels(rect),
            tile.body_length
        );
    }
    Ok(())
}

fn compare(
    input: &Path,
    width: u32,
    quality: f32,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let original = load_image(input)?;
    println!(
        "Original ({} x {}) {} KBytes",
        original.width(),
        original.height(),
        original.byte_count() / 1024
    );

    let resized = preprocess::resize_by_width(&original, width)?;
    let gray = preprocess::to_grayscale(&resized)?;
    let encoded = Jp2Encoder::new(&gray).set_visual_quality(quality).encode()?;
    let decoded = Jp2Decoder::new(&encoded).decode()?;
    println!(
        "JP2 ({} x {}) {} Bytes",
        decoded.width(),
        decoded.height(),
        encoded.len()
    );
    println!(
        "PSNR {:.2} dB, max deviation {}",
        metrics::psnr(&gray, &decoded)?,
        metrics::max_abs_diff(&gray, &decoded)?
    );

    if let Some(path) = output {
        save_image(path, &decoded, OutputFormat::Png)?;
    }
    Ok(())
}
