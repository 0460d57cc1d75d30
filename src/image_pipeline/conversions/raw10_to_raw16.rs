use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::image_pipeline::{
    common::error::{PipelineError, Result},
    raw::{encode_raw16, unpack_raw10, PackedFrame, PackedLayout, PixelGrid},
    tiff::{ConversionConfig, OutputFormat, StandardTiffWriter, TiffWriter},
};

/// Suffix appended to the input stem for converted frames.
const CONVERTED_SUFFIX: &str = "_16";

pub struct Raw10ConversionPipeline<W: TiffWriter> {
    writer: W,
    config: ConversionConfig,
}

impl Raw10ConversionPipeline<StandardTiffWriter> {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            writer: StandardTiffWriter,
            config,
        }
    }
}

impl<W: TiffWriter> Raw10ConversionPipeline<W> {
    pub fn with_custom(writer: W, config: ConversionConfig) -> Self {
        Self { writer, config }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions(width, height));
        }

        Ok(())
    }

    /// Decodes `frame` and writes it to `output` in the configured format.
    #[instrument(skip(self, frame, output), fields(input_size = frame.data.len()))]
    pub fn convert(&self, frame: &PackedFrame<'_>, output: &mut dyn Write) -> Result<PixelGrid> {
        info!("Starting RAW10 conversion");

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = frame.layout.width,
                height = frame.layout.height
            ).entered();
            self.validate_dimensions(frame.layout.width, frame.layout.height)?;
        }

        let grid = {
            let _span = tracing::info_span!("unpack_raw10").entered();
            unpack_raw10(frame)?
        };

        {
            let _span = tracing::info_span!("encode_output").entered();
            match self.config.format {
                OutputFormat::Raw16 => output.write_all(&encode_raw16(&grid))?,
                OutputFormat::Tiff => self.writer.write_tiff(&grid, output, &self.config)?,
            }
        }

        info!(
            width = grid.width(),
            height = grid.height(),
            "Conversion complete"
        );
        Ok(grid)
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        layout: PackedLayout,
    ) -> Result<PixelGrid> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| match e.kind() {
                ErrorKind::NotFound => PipelineError::NotFound(input_path.to_path_buf()),
                _ => PipelineError::IoError(e),
            })?
        };

        // Decode into memory first so a bad input never leaves a truncated output file.
        let mut encoded = Vec::new();
        let grid = self.convert(&PackedFrame::new(&input_data, layout), &mut encoded)?;

        {
            let _span = tracing::info_span!("write_output_file").entered();
            std::fs::write(output_path, &encoded)?;
        }

        Ok(grid)
    }

    /// Converts `input_path` into `output_dir/<stem>_16.<ext>` and returns the written path.
    pub fn convert_into_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: Q,
        layout: PackedLayout,
    ) -> Result<PathBuf> {
        let input_path = input_path.as_ref();
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        let output_path = output_dir.join(format!(
            "{}{}.{}",
            stem,
            CONVERTED_SUFFIX,
            self.config.format.extension()
        ));

        self.convert_file(input_path, &output_path, layout)?;
        Ok(output_path)
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ConversionConfig) {
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::raw::{decode_raw16, pack_raw10, FrameLayout};
    use std::sync::{Arc, Mutex};

    struct MockWriter {
        should_fail: bool,
        written: Arc<Mutex<Vec<PixelGrid>>>,
    }

    impl TiffWriter for MockWriter {
        fn write_tiff(&self, image: &PixelGrid, _output: &mut dyn Write, _config: &ConversionConfig) -> Result<()> {
            if self.should_fail {
                return Err(PipelineError::EncodeError("Mock encode error".to_string()));
            }
            self.written.lock().unwrap().push(image.clone());
            Ok(())
        }
    }

    fn packed_samples() -> (Vec<u16>, Vec<u8>) {
        let samples: Vec<u16> = (0..16).map(|i| i * 60).collect();
        let packed = pack_raw10(&samples);
        (samples, packed)
    }

    #[test]
    fn test_raw16_output_matches_samples() {
        let (samples, packed) = packed_samples();
        let pipeline = Raw10ConversionPipeline::new(ConversionConfig::default());

        let mut output = Vec::new();
        let frame = PackedFrame::new(&packed, PackedLayout::new(4, 4));
        pipeline.convert(&frame, &mut output).unwrap();

        let grid = decode_raw16(&output, &FrameLayout::new(4, 4)).unwrap();
        assert_eq!(grid.data(), samples.as_slice());
    }

    #[test]
    fn test_tiff_output_goes_through_writer() {
        let (_, packed) = packed_samples();
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = MockWriter { should_fail: false, written: written.clone() };
        let config = ConversionConfig::builder().format(OutputFormat::Tiff).build();
        let pipeline = Raw10ConversionPipeline::with_custom(writer, config);

        let mut output = Vec::new();
        let frame = PackedFrame::new(&packed, PackedLayout::new(4, 4));
        pipeline.convert(&frame, &mut output).unwrap();

        assert_eq!(written.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_writer_failure() {
        let (_, packed) = packed_samples();
        let writer = MockWriter { should_fail: true, written: Arc::new(Mutex::new(Vec::new())) };
        let config = ConversionConfig::builder().format(OutputFormat::Tiff).build();
        let pipeline = Raw10ConversionPipeline::with_custom(writer, config);

        let mut output = Vec::new();
        let frame = PackedFrame::new(&packed, PackedLayout::new(4, 4));
        let result = pipeline.convert(&frame, &mut output);
        assert!(matches!(result, Err(PipelineError::EncodeError(_))));
    }

    #[test]
    fn test_dimension_validation_failure() {
        let pipeline = Raw10ConversionPipeline::new(ConversionConfig::default());
        let mut output = Vec::new();
        let frame = PackedFrame::new(&[], PackedLayout::new(0, 4));
        let result = pipeline.convert(&frame, &mut output);
        assert!(matches!(result, Err(PipelineError::InvalidDimensions(0, 4))));
    }

    #[test]
    fn test_convert_into_dir_names_output() {
        let (samples, packed) = packed_samples();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame_0001.raw10");
        std::fs::write(&input, &packed).unwrap();

        let pipeline = Raw10ConversionPipeline::new(ConversionConfig::default());
        let output = pipeline
            .convert_into_dir(&input, dir.path().join("raw16"), PackedLayout::new(4, 4))
            .unwrap();

        assert_eq!(output, dir.path().join("raw16").join("frame_0001_16.raw"));
        let bytes = std::fs::read(&output).unwrap();
        let grid = decode_raw16(&bytes, &FrameLayout::new(4, 4)).unwrap();
        assert_eq!(grid.data(), samples.as_slice());
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Raw10ConversionPipeline::new(ConversionConfig::default());
        let result = pipeline.convert_file(
            dir.path().join("missing.raw10"),
            dir.path().join("out.raw"),
            PackedLayout::new(4, 4),
        );
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
        assert!(!dir.path().join("out.raw").exists());
    }

    #[test]
    fn test_short_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("short.raw10");
        std::fs::write(&input, [0u8; 19]).unwrap();
        let pipeline = Raw10ConversionPipeline::new(ConversionConfig::default());
        let result = pipeline.convert_file(&input, dir.path().join("out.raw"), PackedLayout::new(4, 4));
        assert!(matches!(result, Err(PipelineError::InputSizeMismatch { .. })));
        assert!(!dir.path().join("out.raw").exists());
    }
}
