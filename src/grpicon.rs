use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

// The size of a GRPICONDIR header, in bytes.
const GRPICONDIR_LEN: usize = 6;

// The size of a GRPICONDIRENTRY struct, in bytes.  The struct is packed, so
// there is no padding before the trailing 16-bit resource id.
pub(crate) const GRPICONDIRENTRY_LEN: usize = 14;

//===========================================================================//

/// One entry of an `RT_GROUP_ICON` resource, describing a single icon image
/// stored elsewhere in the module as an `RT_ICON` resource.
///
/// The width and height bytes are copied exactly as stored.  A zero byte
/// conventionally means 256, but it is also what broken resource compilers
/// write for images they couldn't measure, so nothing here reinterprets it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct GroupIconEntry {
    /// Width in pixels (0 may mean 256).
    pub width: u8,
    /// Height in pixels (0 may mean 256).
    pub height: u8,
    /// Number of palette colors, or 0.
    pub color_count: u8,
    /// Reserved; never used for decisions.
    pub reserved: u8,
    /// Color planes.
    pub planes: u16,
    /// Bits per pixel.
    pub bit_count: u16,
    /// Size of the `RT_ICON` resource, in bytes.
    pub bytes_in_res: u32,
    /// The `RT_ICON` resource id holding the image data.
    pub id: u16,
}

impl GroupIconEntry {
    /// Reads the entry stored at `offset` within `buffer`.  Returns
    /// [`Error::TruncatedBuffer`] if fewer than 14 bytes remain.
    pub fn read_at(buffer: &[u8], offset: usize) -> Result<GroupIconEntry> {
        let available = buffer.len().saturating_sub(offset);
        if available < GRPICONDIRENTRY_LEN {
            return Err(Error::TruncatedBuffer {
                offset,
                needed: GRPICONDIRENTRY_LEN,
                available,
            });
        }
        let mut reader = &buffer[offset..offset + GRPICONDIRENTRY_LEN];
        let width = reader.read_u8()?;
        let height = reader.read_u8()?;
        let color_count = reader.read_u8()?;
        let reserved = reader.read_u8()?;
        let planes = reader.read_u16::<LittleEndian>()?;
        let bit_count = reader.read_u16::<LittleEndian>()?;
        let bytes_in_res = reader.read_u32::<LittleEndian>()?;
        let id = reader.read_u16::<LittleEndian>()?;
        Ok(GroupIconEntry {
            width,
            height,
            color_count,
            reserved,
            planes,
            bit_count,
            bytes_in_res,
            id,
        })
    }
}

//===========================================================================//

/// The header of an `RT_GROUP_ICON` resource, along with the raw bytes that
/// its entries are read from.
#[derive(Clone, Debug)]
pub struct GroupIconDir<'a> {
    group_type: u16,
    count: u16,
    data: &'a [u8],
}

impl<'a> GroupIconDir<'a> {
    /// Reads the 6-byte group header.  The entries are parsed lazily by
    /// [`GroupIconDir::entry`], so a resource whose declared count runs past
    /// its end still yields the entries that do fit.
    pub fn read(data: &'a [u8]) -> Result<GroupIconDir<'a>> {
        if data.len() < GRPICONDIR_LEN {
            return Err(Error::TruncatedBuffer {
                offset: 0,
                needed: GRPICONDIR_LEN,
                available: data.len(),
            });
        }
        let mut reader = data;
        let _reserved = reader.read_u16::<LittleEndian>()?;
        let group_type = reader.read_u16::<LittleEndian>()?;
        let count = reader.read_u16::<LittleEndian>()?;
        Ok(GroupIconDir { group_type, count, data })
    }

    /// Returns the resource type field (1 for icons).
    pub fn group_type(&self) -> u16 {
        self.group_type
    }

    /// Returns the number of entries the header declares.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Returns true if this group holds no icon entries at all, either
    /// because the count is zero or because the type field is zero.
    pub fn is_empty(&self) -> bool {
        self.group_type == 0 || self.count == 0
    }

    /// Parses the entry at `index`.
    pub fn entry(&self, index: u16) -> Result<GroupIconEntry> {
        let offset = GRPICONDIR_LEN + GRPICONDIRENTRY_LEN * (index as usize);
        GroupIconEntry::read_at(self.data, offset)
    }

    /// Parses every declared entry, in order.
    pub fn entries(
        &self,
    ) -> impl Iterator<Item = Result<GroupIconEntry>> + '_ {
        (0..self.count).map(move |index| self.entry(index))
    }
}

//===========================================================================//


//===========================================================================//
