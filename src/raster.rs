use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Write};

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
pub(crate) const BMP_HEADER_LEN: u32 = 40;

// Size limits for decoded images:
const MIN_WIDTH: u32 = 1;
const MIN_HEIGHT: u32 = 1;

// Icon bitmaps never come close to this; anything larger is a broken header.
const MAX_BMP_SIZE: u32 = 4096;

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum BmpDepth {
    One,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BmpDepth {
    fn from_bits_per_pixel(bits_per_pixel: u16) -> Option<BmpDepth> {
        match bits_per_pixel {
            1 => Some(BmpDepth::One),
            4 => Some(BmpDepth::Four),
            8 => Some(BmpDepth::Eight),
            16 => Some(BmpDepth::Sixteen),
            24 => Some(BmpDepth::TwentyFour),
            32 => Some(BmpDepth::ThirtyTwo),
            _ => None,
        }
    }

    // Size of the color table that precedes the pixels.
    fn num_colors(&self) -> usize {
        match *self {
            BmpDepth::One => 2,
            BmpDepth::Four => 16,
            BmpDepth::Eight => 256,
            _ => 0,
        }
    }
}

//===========================================================================//

/// A decoded image, ready for display or for re-encoding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IconImage {
    width: u32,
    height: u32,
    rgba_data: Vec<u8>,
}

impl IconImage {
    /// Creates a new image with the given dimensions and RGBA data.  The
    /// `width` and `height` must be nonzero, and `rgba_data` must have `4 *
    /// width * height` bytes and be in row-major order from top to bottom.
    /// Panics if the dimensions are out of range or if `rgba_data` is the
    /// wrong length.
    pub fn from_rgba_data(
        width: u32,
        height: u32,
        rgba_data: Vec<u8>,
    ) -> IconImage {
        if width < MIN_WIDTH {
            panic!(
                "Invalid width (was {}, but must be at least {})",
                width, MIN_WIDTH
            );
        }
        if height < MIN_HEIGHT {
            panic!(
                "Invalid height (was {}, but must be at least {})",
                height, MIN_HEIGHT
            );
        }
        let expected_data_len = (width as u64) * (height as u64) * 4;
        if (rgba_data.len() as u64) != expected_data_len {
            panic!(
                "Invalid data length (was {}, but must be {} for {}x{} image)",
                rgba_data.len(),
                expected_data_len,
                width,
                height
            );
        }
        IconImage { width, height, rgba_data }
    }

    /// Reads just the PNG header, returning the width and height.
    pub(crate) fn read_png_size<R: Read>(reader: R) -> io::Result<(u32, u32)> {
        let png_reader = IconImage::read_png_info(reader)?;
        Ok((png_reader.info().width, png_reader.info().height))
    }

    fn read_png_info<R: Read>(reader: R) -> io::Result<png::Reader<R>> {
        let mut decoder = png::Decoder::new(reader);
        // Palette and 16-bit images come out as 8-bit RGB(A).
        decoder.set_transformations(
            png::Transformations::EXPAND | png::Transformations::STRIP_16,
        );
        let png_reader = match decoder.read_info() {
            Ok(png_reader) => png_reader,
            Err(error) => invalid_data!("Malformed PNG data: {}", error),
        };
        let info = png_reader.info();
        if info.width < MIN_WIDTH || info.height < MIN_HEIGHT {
            invalid_data!(
                "Invalid PNG size (was {}x{}, but must be at least {}x{})",
                info.width,
                info.height,
                MIN_WIDTH,
                MIN_HEIGHT
            );
        }
        Ok(png_reader)
    }

    /// Decodes an image from a PNG file.  Returns an error if the PNG data is
    /// malformed or can't be decoded.
    pub fn read_png<R: Read>(reader: R) -> io::Result<IconImage> {
        let mut png_reader = IconImage::read_png_info(reader)?;
        let mut buffer = vec![0u8; png_reader.output_buffer_size()];
        let frame = match png_reader.next_frame(&mut buffer) {
            Ok(frame) => frame,
            Err(error) => invalid_data!("Malformed PNG data: {}", error),
        };
        buffer.truncate(frame.buffer_size());
        let rgba_data = match frame.color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => {
                let mut rgba = Vec::with_capacity(buffer.len() / 3 * 4);
                for pixel in buffer.chunks_exact(3) {
                    rgba.extend_from_slice(pixel);
                    rgba.push(u8::MAX);
                }
                rgba
            }
            png::ColorType::GrayscaleAlpha => {
                let mut rgba = Vec::with_capacity(buffer.len() * 2);
                for pixel in buffer.chunks_exact(2) {
                    let (gray, alpha) = (pixel[0], pixel[1]);
                    rgba.extend_from_slice(&[gray, gray, gray, alpha]);
                }
                rgba
            }
            png::ColorType::Grayscale => {
                let mut rgba = Vec::with_capacity(buffer.len() * 4);
                for gray in buffer.into_iter() {
                    rgba.extend_from_slice(&[gray, gray, gray, u8::MAX]);
                }
                rgba
            }
            png::ColorType::Indexed => {
                invalid_data!(
                    "Unsupported PNG color type: {:?}",
                    frame.color_type
                );
            }
        };
        let expected_len =
            (frame.width as usize) * (frame.height as usize) * 4;
        if rgba_data.len() != expected_len {
            invalid_data!(
                "Unsupported PNG bit depth: {:?}",
                frame.bit_depth
            );
        }
        Ok(IconImage::from_rgba_data(frame.width, frame.height, rgba_data))
    }

    /// Encodes the image as a PNG file.  Fully opaque images are written
    /// without an alpha channel.
    pub fn write_png<W: Write>(&self, writer: W) -> io::Result<()> {
        match self.write_png_enc(writer) {
            Ok(()) => Ok(()),
            Err(png::EncodingError::IoError(error)) => Err(error),
            Err(png::EncodingError::Format(error)) => {
                invalid_input!("PNG format error: {}", error);
            }
            Err(png::EncodingError::LimitsExceeded) => {
                invalid_input!("PNG limits exceeded");
            }
            Err(png::EncodingError::Parameter(error)) => {
                invalid_input!("PNG parameter error: {}", error);
            }
        }
    }

    fn write_png_enc<W: Write>(
        &self,
        writer: W,
    ) -> Result<(), png::EncodingError> {
        let has_alpha =
            self.rgba_data.chunks_exact(4).any(|pixel| pixel[3] != u8::MAX);
        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_depth(png::BitDepth::Eight);
        if has_alpha {
            encoder.set_color(png::ColorType::Rgba);
        } else {
            encoder.set_color(png::ColorType::Rgb);
        }
        let mut writer = encoder.write_header()?;
        if has_alpha {
            writer.write_image_data(&self.rgba_data)?;
        } else {
            let rgb_data: Vec<u8> = self
                .rgba_data
                .chunks_exact(4)
                .flat_map(|pixel| pixel[..3].iter().copied())
                .collect();
            writer.write_image_data(&rgb_data)?;
        }
        writer.finish()
    }

    /// Reads just the BITMAPINFOHEADER size fields, returning the width and
    /// height (the stored height counts the AND mask too, so it is halved).
    pub(crate) fn read_bmp_size<R: Read>(
        reader: &mut R,
    ) -> io::Result<(u32, u32)> {
        let data_size = reader.read_u32::<LittleEndian>()?;
        if data_size != BMP_HEADER_LEN {
            invalid_data!(
                "Invalid BMP header size (was {}, must be {})",
                data_size,
                BMP_HEADER_LEN
            );
        }
        let width = reader.read_i32::<LittleEndian>()?;
        if width < (MIN_WIDTH as i32) {
            invalid_data!(
                "Invalid BMP width (was {}, but must be at least {})",
                width,
                MIN_WIDTH
            );
        }
        let width = width as u32;
        if width > MAX_BMP_SIZE {
            invalid_data!(
                "Invalid BMP width (was {}, but must be at most {})",
                width,
                MAX_BMP_SIZE
            );
        }
        let height = reader.read_i32::<LittleEndian>()?;
        if height % 2 != 0 {
            // The height is stored doubled, counting the rows of both the
            // color data and the alpha mask, so it should be divisible by 2.
            invalid_data!(
                "Invalid height field in BMP header \
                 (was {}, but must be divisible by 2)",
                height
            );
        }
        let height = height / 2;
        if height < (MIN_HEIGHT as i32) {
            invalid_data!(
                "Invalid BMP height (was {}, but must be at least {})",
                height,
                MIN_HEIGHT
            );
        }
        let height = height as u32;
        if height > MAX_BMP_SIZE {
            invalid_data!(
                "Invalid BMP height (was {}, but must be at most {})",
                height,
                MAX_BMP_SIZE
            );
        }
        Ok((width, height))
    }

    /// Decodes an image from the BMP data stored in an icon resource
    /// (BITMAPINFOHEADER, color table, XOR pixels, AND mask).
    pub fn read_bmp<R: Read>(mut reader: R) -> io::Result<IconImage> {
        // Read the BITMAPINFOHEADER struct:
        let (width, height) = IconImage::read_bmp_size(&mut reader)?;
        let _planes = reader.read_u16::<LittleEndian>()?;
        let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
        let _compression = reader.read_u32::<LittleEndian>()?;
        let _image_size = reader.read_u32::<LittleEndian>()?;
        let _horz_ppm = reader.read_i32::<LittleEndian>()?;
        let _vert_ppm = reader.read_i32::<LittleEndian>()?;
        let _colors_used = reader.read_u32::<LittleEndian>()?;
        let _colors_important = reader.read_u32::<LittleEndian>()?;

        let depth = match BmpDepth::from_bits_per_pixel(bits_per_pixel) {
            Some(depth) => depth,
            None => {
                invalid_data!(
                    "Unsupported BMP bits-per-pixel ({})",
                    bits_per_pixel
                );
            }
        };
        let num_colors = depth.num_colors();

        let mut color_table = Vec::<(u8, u8, u8)>::with_capacity(num_colors);
        for _ in 0..num_colors {
            let blue = reader.read_u8()?;
            let green = reader.read_u8()?;
            let red = reader.read_u8()?;
            let _reserved = reader.read_u8()?;
            color_table.push((red, green, blue));
        }

        // Rows are stored bottom-up, each padded to a multiple of 4 bytes.
        let rgba_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|num_pixels| num_pixels.checked_mul(4));
        let mut rgba = match rgba_len {
            Some(len) => vec![u8::MAX; len],
            None => invalid_data!("Width * Height is too large"),
        };
        let row_bits = width
            .checked_mul(bits_per_pixel as u32)
            .and_then(|bits| bits.checked_add(7));
        let row_data_size = match row_bits {
            Some(bits) => bits / 8,
            None => invalid_data!("BMP row is too large"),
        };
        let row_padding_size = ((row_data_size + 3) / 4) * 4 - row_data_size;
        let mut row_padding = vec![0; row_padding_size as usize];
        for row in 0..height {
            let start = 4 * (height - row - 1) as usize * width as usize;
            let pixels = &mut rgba[start..start + 4 * width as usize];
            match depth {
                BmpDepth::One | BmpDepth::Four | BmpDepth::Eight => {
                    let bits = bits_per_pixel as u32;
                    let mask = ((1u16 << bits) - 1) as u8;
                    let per_byte = 8 / bits;
                    let mut col = 0;
                    for _ in 0..row_data_size {
                        let byte = reader.read_u8()?;
                        for slot in 0..per_byte {
                            if col == width {
                                break;
                            }
                            let shift = bits * (per_byte - 1 - slot);
                            let index = ((byte >> shift) & mask) as usize;
                            let (red, green, blue) =
                                match color_table.get(index) {
                                    Some(&color) => color,
                                    None => invalid_data!(
                                        "BMP color index {} out of range",
                                        index
                                    ),
                                };
                            let pixel = &mut pixels[4 * col as usize..];
                            pixel[0] = red;
                            pixel[1] = green;
                            pixel[2] = blue;
                            col += 1;
                        }
                    }
                }
                BmpDepth::Sixteen => {
                    for pixel in pixels.chunks_exact_mut(4) {
                        let color = reader.read_u16::<LittleEndian>()?;
                        let red = (color >> 10) & 0x1f;
                        let green = (color >> 5) & 0x1f;
                        let blue = color & 0x1f;
                        pixel[0] = ((red * 255 + 15) / 31) as u8;
                        pixel[1] = ((green * 255 + 15) / 31) as u8;
                        pixel[2] = ((blue * 255 + 15) / 31) as u8;
                    }
                }
                BmpDepth::TwentyFour => {
                    for pixel in pixels.chunks_exact_mut(4) {
                        let blue = reader.read_u8()?;
                        let green = reader.read_u8()?;
                        let red = reader.read_u8()?;
                        pixel[0] = red;
                        pixel[1] = green;
                        pixel[2] = blue;
                    }
                }
                BmpDepth::ThirtyTwo => {
                    for pixel in pixels.chunks_exact_mut(4) {
                        let blue = reader.read_u8()?;
                        let green = reader.read_u8()?;
                        let red = reader.read_u8()?;
                        let alpha = reader.read_u8()?;
                        pixel[0] = red;
                        pixel[1] = green;
                        pixel[2] = blue;
                        pixel[3] = alpha;
                    }
                }
            }
            reader.read_exact(&mut row_padding)?;
        }

        // The AND mask (1 bit per pixel) follows, also bottom-up and padded.
        // 32-bit images carry their own alpha and ignore it.
        if depth != BmpDepth::ThirtyTwo {
            let row_mask_size = (width + 7) / 8;
            let row_padding_size =
                ((row_mask_size + 3) / 4) * 4 - row_mask_size;
            let mut row_padding = vec![0; row_padding_size as usize];
            for row in 0..height {
                let start = 4 * (height - row - 1) as usize * width as usize;
                let mut col = 0;
                for _ in 0..row_mask_size {
                    let byte = reader.read_u8()?;
                    for bit in 0..8 {
                        if col == width {
                            break;
                        }
                        if ((byte >> (7 - bit)) & 0x1) == 1 {
                            rgba[start + 4 * col as usize + 3] = 0;
                        }
                        col += 1;
                    }
                }
                reader.read_exact(&mut row_padding)?;
            }
        }

        Ok(IconImage::from_rgba_data(width, height, rgba))
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the RGBA data for this image, in row-major order from top to
    /// bottom.
    pub fn rgba_data(&self) -> &[u8] {
        &self.rgba_data
    }

    /// Consumes the image, returning its RGBA data.
    pub fn into_rgba_data(self) -> Vec<u8> {
        self.rgba_data
    }
}

//===========================================================================//


//===========================================================================//
