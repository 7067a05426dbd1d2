//! Encoding Normalizer.
//!
//! Accepted input tags: `8UC1`, `mono8`, `mono16`, `bgr8`, `rgb8`, `bgra8`,
//! `rgba8`. Output is tightly packed `mono8`, or `bgr8` when color is kept
//! and the source has color. Input buffers are never mutated; pass-through
//! cases share the input `Bytes` without copying.

use bytes::Bytes;
use contracts::{CanonicalFormat, FrameError, ImageMessage, NormalizedImage};

/// Pixel layouts the conditioner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelEncoding {
    /// `mono8` or the generic `8UC1` tag
    Mono8,
    Mono16,
    Bgr8,
    Rgb8,
    Bgra8,
    Rgba8,
}

impl PixelEncoding {
    /// Parse a wire encoding tag.
    pub fn parse(tag: &str) -> Result<Self, FrameError> {
        match tag {
            "mono8" | "8UC1" => Ok(Self::Mono8),
            "mono16" => Ok(Self::Mono16),
            "bgr8" => Ok(Self::Bgr8),
            "rgb8" => Ok(Self::Rgb8),
            "bgra8" => Ok(Self::Bgra8),
            "rgba8" => Ok(Self::Rgba8),
            other => Err(FrameError::unsupported_encoding(other)),
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Mono8 => 1,
            Self::Mono16 => 2,
            Self::Bgr8 | Self::Rgb8 => 3,
            Self::Bgra8 | Self::Rgba8 => 4,
        }
    }

    pub const fn has_color(self) -> bool {
        !matches!(self, Self::Mono8 | Self::Mono16)
    }

    /// Canonical format this encoding normalizes to.
    ///
    /// Grayscale sources stay grayscale; `mono16` never becomes color.
    pub const fn target(self, keep_color: bool) -> CanonicalFormat {
        if keep_color && self.has_color() {
            CanonicalFormat::Bgr8
        } else {
            CanonicalFormat::Mono8
        }
    }
}

/// Integer BT.601 luma, Q14 fixed point.
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((4899 * u32::from(r) + 9617 * u32::from(g) + 1868 * u32::from(b) + 8192) >> 14) as u8
}

#[inline]
fn scale_16_to_8(value: u16) -> u8 {
    ((u32::from(value) * 255 + 32767) / 65535) as u8
}

/// Validate the buffer against its geometry and return the packed row length.
fn check_layout(image: &ImageMessage, bytes_per_pixel: usize) -> Result<usize, FrameError> {
    let row = image.width as usize * bytes_per_pixel;
    let step = image.step as usize;
    if step < row {
        return Err(FrameError::malformed(
            image.width,
            image.height,
            image.step,
            format!("step shorter than {row} byte row"),
        ));
    }
    let needed = step * image.height as usize;
    if image.data.len() < needed {
        return Err(FrameError::malformed(
            image.width,
            image.height,
            image.step,
            format!("buffer holds {} bytes, expected {needed}", image.data.len()),
        ));
    }
    Ok(row)
}

fn rows<'a>(image: &'a ImageMessage, row: usize) -> impl Iterator<Item = &'a [u8]> + 'a {
    let step = image.step as usize;
    (0..image.height as usize).map(move |y| &image.data[y * step..y * step + row])
}

/// Convert `image` to its canonical form.
///
/// # Errors
/// `UnsupportedEncoding` for unknown tags, `MalformedImage` when the buffer
/// does not match the declared geometry.
pub fn normalize(image: &ImageMessage, keep_color: bool) -> Result<NormalizedImage, FrameError> {
    let encoding = PixelEncoding::parse(&image.encoding)?;
    normalize_as(image, encoding, encoding.target(keep_color))
}

/// Convert an already parsed image to an explicit target format.
///
/// `Mono16 -> Bgr8` is not a defined conversion and falls back to `Mono8`.
pub fn normalize_as(
    image: &ImageMessage,
    encoding: PixelEncoding,
    target: CanonicalFormat,
) -> Result<NormalizedImage, FrameError> {
    let target = if encoding.has_color() {
        target
    } else {
        CanonicalFormat::Mono8
    };
    let bpp = encoding.bytes_per_pixel();
    let row = check_layout(image, bpp)?;
    let pixels = image.width as usize * image.height as usize;

    let data = match (encoding, target) {
        (PixelEncoding::Mono8, _) | (PixelEncoding::Bgr8, CanonicalFormat::Bgr8) => {
            pack_rows(image, row)
        }
        (PixelEncoding::Mono16, _) => {
            let mut out = Vec::with_capacity(pixels);
            for line in rows(image, row) {
                out.extend(line.chunks_exact(2).map(|px| {
                    let value = if image.is_bigendian {
                        u16::from_be_bytes([px[0], px[1]])
                    } else {
                        u16::from_le_bytes([px[0], px[1]])
                    };
                    scale_16_to_8(value)
                }));
            }
            Bytes::from(out)
        }
        (_, CanonicalFormat::Bgr8) => {
            // Rgb8, Bgra8 or Rgba8 to packed bgr.
            let swap = matches!(encoding, PixelEncoding::Rgb8 | PixelEncoding::Rgba8);
            let mut out = Vec::with_capacity(pixels * 3);
            for line in rows(image, row) {
                for px in line.chunks_exact(bpp) {
                    if swap {
                        out.extend_from_slice(&[px[2], px[1], px[0]]);
                    } else {
                        out.extend_from_slice(&px[..3]);
                    }
                }
            }
            Bytes::from(out)
        }
        (_, CanonicalFormat::Mono8) => {
            let (r, b) = match encoding {
                PixelEncoding::Rgb8 | PixelEncoding::Rgba8 => (0, 2),
                _ => (2, 0),
            };
            let mut out = Vec::with_capacity(pixels);
            for line in rows(image, row) {
                out.extend(line.chunks_exact(bpp).map(|px| luma(px[r], px[1], px[b])));
            }
            Bytes::from(out)
        }
    };

    Ok(NormalizedImage {
        width: image.width,
        height: image.height,
        format: target,
        data,
    })
}

/// Share the buffer when rows are already packed, otherwise strip padding.
fn pack_rows(image: &ImageMessage, row: usize) -> Bytes {
    let packed = row * image.height as usize;
    if image.step as usize == row {
        return image.data.slice(..packed);
    }
    let mut out = Vec::with_capacity(packed);
    for line in rows(image, row) {
        out.extend_from_slice(line);
    }
    Bytes::from(out)
}
