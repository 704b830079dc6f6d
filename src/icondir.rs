use crate::candidate::PNG_SIGNATURE;
use crate::raster::IconImage;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};

//===========================================================================//

// The ICONDIR resource type number for icons.
const ICON_RESOURCE_TYPE: u16 = 1;

//===========================================================================//

/// The images of an ICO file, as read back from disk or from a serialized
/// candidate.
#[derive(Clone, Debug)]
pub(crate) struct IcoContainer {
    entries: Vec<IcoEntry>,
}

impl IcoContainer {
    /// Returns true if `data` starts like an ICO file (reserved 0, type 1).
    pub(crate) fn sniff(data: &[u8]) -> bool {
        data.len() >= 6 && data[0..4] == [0, 0, ICON_RESOURCE_TYPE as u8, 0]
    }

    pub(crate) fn entries(&self) -> &[IcoEntry] {
        &self.entries
    }

    /// Reads an ICO file into memory.
    pub(crate) fn read<R: Read + Seek>(mut reader: R) -> io::Result<IcoContainer> {
        let reserved = reader.read_u16::<LittleEndian>()?;
        if reserved != 0 {
            invalid_data!(
                "Invalid reserved field value in ICONDIR \
                 (was {}, but must be 0)",
                reserved
            );
        }
        let restype = reader.read_u16::<LittleEndian>()?;
        if restype != ICON_RESOURCE_TYPE {
            invalid_data!("Invalid resource type ({})", restype);
        }
        let num_entries = reader.read_u16::<LittleEndian>()? as usize;
        let mut entries = Vec::<IcoEntry>::with_capacity(num_entries);
        let mut spans = Vec::<(u32, u32)>::with_capacity(num_entries);
        for _ in 0..num_entries {
            let width = reader.read_u8()?;
            let height = reader.read_u8()?;
            let _num_colors = reader.read_u8()?;
            // Resource compilers leave junk in the reserved byte often
            // enough that it isn't checked here.
            let _reserved = reader.read_u8()?;
            let _color_planes = reader.read_u16::<LittleEndian>()?;
            let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
            let data_size = reader.read_u32::<LittleEndian>()?;
            let data_offset = reader.read_u32::<LittleEndian>()?;
            spans.push((data_offset, data_size));
            entries.push(IcoEntry {
                width,
                height,
                bits_per_pixel,
                data: Vec::new(),
            });
        }
        for (index, &(data_offset, data_size)) in spans.iter().enumerate() {
            reader.seek(SeekFrom::Start(data_offset as u64))?;
            let mut data = vec![0u8; data_size as usize];
            reader.read_exact(&mut data)?;
            entries[index].data = data;
        }
        Ok(IcoContainer { entries })
    }
}

//===========================================================================//

/// One image of an ICO file.
#[derive(Clone, Debug)]
pub(crate) struct IcoEntry {
    width: u8,
    height: u8,
    bits_per_pixel: u16,
    data: Vec<u8>,
}

impl IcoEntry {
    /// Returns the size recorded in the directory entry, with a zero byte
    /// read as 256.  Not to be trusted over [`IcoEntry::decode_size`].
    pub(crate) fn nominal_size(&self) -> (u32, u32) {
        let width = if self.width == 0 { 256 } else { self.width as u32 };
        let height = if self.height == 0 { 256 } else { self.height as u32 };
        (width, height)
    }

    pub(crate) fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    pub(crate) fn is_png(&self) -> bool {
        self.data.starts_with(PNG_SIGNATURE)
    }

    /// Decodes just enough of the image data to determine its real size.
    pub(crate) fn decode_size(&self) -> io::Result<(u32, u32)> {
        if self.is_png() {
            IconImage::read_png_size(self.data.as_slice())
        } else {
            IconImage::read_bmp_size(&mut self.data.as_slice())
        }
    }

    /// Decodes this entry into an image.
    pub(crate) fn decode(&self) -> io::Result<IconImage> {
        if self.is_png() {
            IconImage::read_png(self.data.as_slice())
        } else {
            IconImage::read_bmp(self.data.as_slice())
        }
    }
}

//===========================================================================//


//===========================================================================//
