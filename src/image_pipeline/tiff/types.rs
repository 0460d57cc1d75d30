//! RAW10 conversion configuration types

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level (good speed/size balance)
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

/// Container written by the RAW10 conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Headerless little-endian 16-bit samples
    Raw16,
    /// Single-channel 16-bit TIFF
    Tiff,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Raw16 => "raw",
            OutputFormat::Tiff => "tiff",
        }
    }
}

/// Configuration for RAW10 to RAW16/TIFF conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Output container
    pub format: OutputFormat,
    /// Compression method to use for TIFF output
    pub compression: TiffCompression,
    /// Predictor value for compression (typically 2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Whether to validate image dimensions before conversion
    pub validate_dimensions: bool,
    /// Multiply 10-bit samples by 64 so TIFF viewers show the full range
    pub scale_to_16bit: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Raw16,
            compression: TiffCompression::None,
            predictor: None,
            validate_dimensions: true,
            scale_to_16bit: false,
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    format: Option<OutputFormat>,
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    validate_dimensions: Option<bool>,
    scale_to_16bit: Option<bool>,
}

impl ConversionConfigBuilder {
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn scale_to_16bit(mut self, enable: bool) -> Self {
        self.scale_to_16bit = Some(enable);
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            format: self.format.unwrap_or(default.format),
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            scale_to_16bit: self.scale_to_16bit.unwrap_or(default.scale_to_16bit),
        }
    }
}
