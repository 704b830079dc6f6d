use crate::candidate::PNG_SIGNATURE;
use crate::icondir::{IcoContainer, IcoEntry};
use crate::raster::IconImage;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::io::{self, Cursor};
use tracing::debug;

//===========================================================================//

/// Decoding and resizing of icon image data.
///
/// The byte slices handed to a codec are serialized candidates: a PNG file,
/// an ICO file, or (for raw resources) a bare BMP without its file header.
pub trait ImageCodec {
    /// Determines the real pixel size of an encoded image.
    fn decode_size(&self, data: &[u8]) -> io::Result<(u32, u32)>;

    /// Decodes an encoded image into RGBA pixels.
    fn decode(&self, data: &[u8]) -> io::Result<IconImage>;

    /// Scales an image to the given width, keeping its aspect ratio.
    fn resize_to_width(&self, image: &IconImage, width: u32) -> IconImage;
}

//===========================================================================//

/// The built-in codec: PNG, BMP and ICO decoding, with bicubic resampling.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardCodec;

impl StandardCodec {
    // Picks the biggest (then deepest) image of an ICO file, which is the
    // one a viewer would render at full size.
    fn largest_entry(ico: &IcoContainer) -> io::Result<(&IcoEntry, (u32, u32))> {
        let mut best: Option<(&IcoEntry, (u32, u32))> = None;
        for entry in ico.entries() {
            let size = match entry.decode_size() {
                Ok(size) => size,
                Err(error) => {
                    debug!("Skipping unreadable ICO image: {}", error);
                    continue;
                }
            };
            if size != entry.nominal_size() {
                debug!(
                    "ICO entry claims {:?} but its image is {:?}",
                    entry.nominal_size(),
                    size
                );
            }
            let better = match best {
                None => true,
                Some((current, (width, height))) => {
                    let area = (size.0 as u64) * (size.1 as u64);
                    let best_area = (width as u64) * (height as u64);
                    area > best_area
                        || (area == best_area
                            && entry.bits_per_pixel()
                                > current.bits_per_pixel())
                }
            };
            if better {
                best = Some((entry, size));
            }
        }
        match best {
            Some(best) => Ok(best),
            None => invalid_data!("ICO file contains no readable images"),
        }
    }
}

impl ImageCodec for StandardCodec {
    fn decode_size(&self, data: &[u8]) -> io::Result<(u32, u32)> {
        if data.starts_with(PNG_SIGNATURE) {
            IconImage::read_png_size(data)
        } else if IcoContainer::sniff(data) {
            let ico = IcoContainer::read(Cursor::new(data))?;
            let (_, size) = StandardCodec::largest_entry(&ico)?;
            Ok(size)
        } else {
            IconImage::read_bmp_size(&mut &data[..])
        }
    }

    fn decode(&self, data: &[u8]) -> io::Result<IconImage> {
        if data.starts_with(PNG_SIGNATURE) {
            IconImage::read_png(data)
        } else if IcoContainer::sniff(data) {
            let ico = IcoContainer::read(Cursor::new(data))?;
            let (entry, _) = StandardCodec::largest_entry(&ico)?;
            entry.decode()
        } else {
            IconImage::read_bmp(data)
        }
    }

    fn resize_to_width(&self, image: &IconImage, width: u32) -> IconImage {
        let width = width.max(1);
        if width == image.width() {
            return image.clone();
        }
        let ratio = width as f64 / image.width() as f64;
        let height = ((image.height() as f64 * ratio).round() as u32).max(1);
        let source = match RgbaImage::from_raw(
            image.width(),
            image.height(),
            image.rgba_data().to_vec(),
        ) {
            Some(source) => source,
            // IconImage guarantees 4 * width * height bytes.
            None => unreachable!("RGBA buffer does not match image size"),
        };
        let resized =
            imageops::resize(&source, width, height, FilterType::CatmullRom);
        IconImage::from_rgba_data(width, height, resized.into_raw())
    }
}

//===========================================================================//

#[cfg(test)]
pub(crate) mod testing {
    use byteorder::{LittleEndian, WriteBytesExt};

    /// Builds the BMP data of an opaque, 32 bpp `width` x `height` icon
    /// resource, filled with one color.
    pub(crate) fn bmp_resource(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(40).unwrap();
        data.write_i32::<LittleEndian>(width as i32).unwrap();
        data.write_i32::<LittleEndian>(2 * height as i32).unwrap();
        data.write_u16::<LittleEndian>(1).unwrap();
        data.write_u16::<LittleEndian>(32).unwrap();
        data.extend_from_slice(&[0u8; 24]);
        for _ in 0..(width * height) {
            data.extend_from_slice(&[0x30, 0x60, 0x90, 0xff]);
        }
        let mask_row = ((width + 7) / 8 + 3) / 4 * 4;
        data.extend(std::iter::repeat(0u8).take((mask_row * height) as usize));
        data
    }
}


//===========================================================================//
