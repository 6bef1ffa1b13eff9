/// Pixel types written into NITF image segments by SAR and EO products.
///
/// All multi-byte samples are big-endian on disk.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// Complex, 32-bit float real and imaginary bands.
    Re32fIm32f,
    /// Complex, 16-bit signed integer real and imaginary bands.
    Re16iIm16i,
    /// Complex, 8-bit amplitude and phase bands.
    Amp8iPhs8i,
    /// Single band, 8-bit.
    Mono8i,
    /// Single band, 16-bit.
    Mono16i,
    /// Single band, 8-bit index into a mono lookup table.
    Mono8lu,
    /// Single band, 8-bit index into an RGB lookup table.
    Rgb8lu,
    /// Three bands, 8-bit each.
    Rgb24i,
}

impl PixelType {
    /// Bytes per pixel across all bands.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Re32fIm32f => 8,
            Self::Re16iIm16i => 4,
            Self::Amp8iPhs8i | Self::Mono16i => 2,
            Self::Mono8i | Self::Mono8lu | Self::Rgb8lu => 1,
            Self::Rgb24i => 3,
        }
    }

    /// Number of image bands (NBANDS).
    pub fn bands(&self) -> usize {
        match self {
            Self::Re32fIm32f | Self::Re16iIm16i | Self::Amp8iPhs8i => 2,
            Self::Mono8i | Self::Mono16i | Self::Mono8lu | Self::Rgb8lu => 1,
            Self::Rgb24i => 3,
        }
    }

    /// Bits per band (NBPP).
    pub fn bits_per_band(&self) -> u32 {
        (self.bytes_per_pixel() / self.bands()) as u32 * 8
    }
}

/// Bytes per pixel for `bands` bands of `bits_per_pixel` bits each.
///
/// NITF stores each band sample in whole bytes, so 12-bit data occupies two
/// bytes per band.
pub fn bytes_per_pixel_for(bits_per_pixel: u32, bands: usize) -> usize {
    (bits_per_pixel as usize).div_ceil(8) * bands
}
