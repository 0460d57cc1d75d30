use anyhow::Context;
use flare_response_rs::image_pipeline::{ConversionConfig, OutputFormat, PackedLayout, Raw10ConversionPipeline};
use flare_response_rs::logger;

use tracing::{error, info};

/// Sensor geometry of the flare rig's RAW10 dumps.
const DEFAULT_WIDTH: usize = 2328;
const DEFAULT_HEIGHT: usize = 1748;
const DEFAULT_STRIDE_BYTES: usize = 2912;

fn main() -> anyhow::Result<()> {
    logger::init();

    info!("Starting flare_response RAW10 conversion...");

    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "input.raw10".to_string());
    let output_dir = args.next().unwrap_or_else(|| "raw16".to_string());

    let config = ConversionConfig::builder()
        .format(OutputFormat::Raw16)
        .build();
    let pipeline = Raw10ConversionPipeline::new(config);
    let layout = PackedLayout::new(DEFAULT_WIDTH, DEFAULT_HEIGHT).with_stride(DEFAULT_STRIDE_BYTES);

    info!("RAW10 conversion pipeline initialized");
    info!("Output format: {:?}", pipeline.config().format);
    info!(
        "Geometry: {}x{}, stride {} bytes",
        layout.width, layout.height, DEFAULT_STRIDE_BYTES
    );

    match pipeline
        .convert_into_dir(&input, &output_dir, layout)
        .with_context(|| format!("converting {}", input))
    {
        Ok(path) => info!("Conversion successful: {}", path.display()),
        Err(e) => {
            error!("Conversion failed: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}
