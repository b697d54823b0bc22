//! Raster images embedded as image XObjects

use crate::{PdfError, Result};
use flate2::{write::ZlibEncoder, Compression};
use image::{DynamicImage, ImageDecoder, ImageReader};
use lopdf::{Dictionary, Stream};
use std::io::{Cursor, Write};
use std::path::Path;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Encodings accepted for raster images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Sniff the format from the leading bytes
    pub fn detect(data: &[u8]) -> Result<Self> {
        if data.starts_with(PNG_MAGIC) {
            Ok(Self::Png)
        } else if data.len() >= PNG_MAGIC.len() && data.starts_with(JPEG_MAGIC) {
            Ok(Self::Jpeg)
        } else {
            Err(PdfError::ImageError("not a JPEG or PNG image".to_string()))
        }
    }
}

/// Width, height and component count from the first SOF segment
fn jpeg_info(data: &[u8]) -> Result<(u32, u32, u8)> {
    let mut i = 2;
    while i + 10 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];
        // SOF0..SOF15 except DHT, JPG and DAC
        if (0xC0..=0xCF).contains(&marker) && ![0xC4, 0xC8, 0xCC].contains(&marker) {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Ok((width, height, data[i + 9]));
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if length < 2 {
            break;
        }
        i += 2 + length;
    }

    Err(PdfError::ImageError("Could not parse JPEG header".to_string()))
}

/// Blend a channel value with a white background
fn over_white(value: u8, alpha: u8) -> u8 {
    let alpha = alpha as f32 / 255.0;
    (value as f32 * alpha + 255.0 * (1.0 - alpha)) as u8
}

/// A raster image ready to be written as an image XObject
///
/// Samples are always 8 bits per component.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    pub color_space: &'static str,
    /// `DCTDecode` for JPEG passthrough, `FlateDecode` for decoded PNG
    pub filter: &'static str,
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Load a JPEG or PNG file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| PdfError::ImageError(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&data)
    }

    /// Create an XObject from JPEG or PNG bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match ImageFormat::detect(data)? {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    /// JPEG data is embedded as-is with DCTDecode
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let (width, height, components) = jpeg_info(data)?;

        let color_space = match components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };

        Ok(Self {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data: data.to_vec(),
        })
    }

    /// PNG data is decoded, flattened onto white and re-encoded with FlateDecode
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let decoder = reader.into_decoder()?;
        let (width, height) = decoder.dimensions();
        let color_type = decoder.color_type();
        let image = DynamicImage::from_decoder(decoder)?;

        let (raw, color_space) = match color_type {
            image::ColorType::L8 | image::ColorType::L16 => {
                (image.to_luma8().into_raw(), "DeviceGray")
            }
            image::ColorType::La8 | image::ColorType::La16 => {
                let raw = image
                    .to_luma_alpha8()
                    .pixels()
                    .map(|p| over_white(p[0], p[1]))
                    .collect();
                (raw, "DeviceGray")
            }
            image::ColorType::Rgba8 | image::ColorType::Rgba16 => {
                let raw = image
                    .to_rgba8()
                    .pixels()
                    .flat_map(|p| [over_white(p[0], p[3]), over_white(p[1], p[3]), over_white(p[2], p[3])])
                    .collect();
                (raw, "DeviceRGB")
            }
            _ => (image.to_rgb8().into_raw(), "DeviceRGB"),
        };

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;

        Ok(Self {
            width,
            height,
            color_space,
            filter: "FlateDecode",
            data: encoder.finish()?,
        })
    }

    /// Display height for `width`, keeping the pixel aspect ratio
    ///
    /// An image with no pixels keeps a square box.
    pub fn height_for_width(&self, width: f64) -> f64 {
        if self.width == 0 || self.height == 0 {
            return width;
        }
        width * self.height as f64 / self.width as f64
    }

    pub fn to_pdf_stream(&self) -> Stream {
        let dict = Dictionary::from_iter(vec![
            ("Type", "XObject".into()),
            ("Subtype", "Image".into()),
            ("Width", i64::from(self.width).into()),
            ("Height", i64::from(self.height).into()),
            ("ColorSpace", self.color_space.into()),
            ("BitsPerComponent", 8.into()),
            ("Filter", self.filter.into()),
        ]);

        // Already encoded, lopdf must not compress it again
        Stream::new(dict, self.data.clone()).with_compression(false)
    }
}
