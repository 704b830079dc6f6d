//! Reading the target out of Windows shell-link (`.lnk`) files.

use crate::provider::PathResolver;
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

//===========================================================================//

const HEADER_LEN: u32 = 0x4C;
// 00021401-0000-0000-C000-000000000046, in on-disk byte order.
const LINK_CLSID: [u8; 16] = [
    0x01, 0x14, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x46,
];

const HAS_LINK_TARGET_ID_LIST: u32 = 0x0000_0001;
const HAS_LINK_INFO: u32 = 0x0000_0002;
const VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 0x0000_0001;

// LinkInfo headers at least this long carry Unicode path offsets.
const UNICODE_LINK_INFO_HEADER_LEN: u32 = 0x24;

//===========================================================================//

/// The parts of a shell link that matter for finding its icon.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShellLink {
    local_base_path: Option<String>,
}

impl ShellLink {
    /// Parses a shell link.
    pub fn read<R: Read>(mut reader: R) -> io::Result<ShellLink> {
        let header_len = reader.read_u32::<LittleEndian>()?;
        if header_len != HEADER_LEN {
            invalid_data!(
                "Invalid shell link header size (was {:#X}, but must be {:#X})",
                header_len,
                HEADER_LEN
            );
        }
        let mut clsid = [0u8; 16];
        reader.read_exact(&mut clsid)?;
        if clsid != LINK_CLSID {
            invalid_data!("Invalid shell link class id");
        }
        let flags = reader.read_u32::<LittleEndian>()?;
        // Attributes, times, file size, icon index, show command, hot key
        // and reserved fields.
        let mut rest = [0u8; (HEADER_LEN - 24) as usize];
        reader.read_exact(&mut rest)?;

        if flags & HAS_LINK_TARGET_ID_LIST != 0 {
            let id_list_len = reader.read_u16::<LittleEndian>()?;
            io::copy(&mut (&mut reader).take(id_list_len as u64), &mut io::sink())?;
        }
        if flags & HAS_LINK_INFO == 0 {
            return Ok(ShellLink { local_base_path: None });
        }

        let link_info_len = reader.read_u32::<LittleEndian>()?;
        if link_info_len < 28 {
            invalid_data!("LinkInfo too small ({} bytes)", link_info_len);
        }
        // Grow the buffer as the data arrives, so that a bogus size can't
        // make us allocate more than the link actually holds.
        let mut link_info = link_info_len.to_le_bytes().to_vec();
        reader
            .take(link_info_len as u64 - 4)
            .read_to_end(&mut link_info)?;
        if link_info.len() != link_info_len as usize {
            invalid_data!(
                "LinkInfo truncated (was {} bytes, but must be {})",
                link_info.len(),
                link_info_len
            );
        }
        let local_base_path = ShellLink::read_local_base_path(&link_info)?;
        Ok(ShellLink { local_base_path })
    }

    fn read_local_base_path(link_info: &[u8]) -> io::Result<Option<String>> {
        let mut fields = &link_info[4..];
        let header_len = fields.read_u32::<LittleEndian>()?;
        let flags = fields.read_u32::<LittleEndian>()?;
        let _volume_id_offset = fields.read_u32::<LittleEndian>()?;
        let local_base_path_offset = fields.read_u32::<LittleEndian>()?;
        let _network_link_offset = fields.read_u32::<LittleEndian>()?;
        let suffix_offset = fields.read_u32::<LittleEndian>()?;
        if flags & VOLUME_ID_AND_LOCAL_BASE_PATH == 0 {
            return Ok(None);
        }
        if header_len >= UNICODE_LINK_INFO_HEADER_LEN {
            let unicode_path_offset = fields.read_u32::<LittleEndian>()?;
            let unicode_suffix_offset = fields.read_u32::<LittleEndian>()?;
            if unicode_path_offset != 0 {
                let mut path = read_utf16_string(link_info, unicode_path_offset)?;
                if unicode_suffix_offset != 0 {
                    path.push_str(&read_utf16_string(link_info, unicode_suffix_offset)?);
                }
                return Ok(Some(path));
            }
        }
        let mut path = read_ansi_string(link_info, local_base_path_offset)?;
        if suffix_offset != 0 {
            path.push_str(&read_ansi_string(link_info, suffix_offset)?);
        }
        Ok(Some(path))
    }

    /// Returns the local path the link points at, if it has one.
    pub fn local_base_path(&self) -> Option<&str> {
        self.local_base_path.as_deref()
    }
}

fn read_ansi_string(data: &[u8], offset: u32) -> io::Result<String> {
    let start = offset as usize;
    if start >= data.len() {
        invalid_data!("String offset {} is past the end of LinkInfo", offset);
    }
    let bytes = &data[start..];
    let end = match bytes.iter().position(|&byte| byte == 0) {
        Some(end) => end,
        None => invalid_data!("Unterminated string in LinkInfo"),
    };
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

fn read_utf16_string(data: &[u8], offset: u32) -> io::Result<String> {
    let start = offset as usize;
    if start >= data.len() {
        invalid_data!("String offset {} is past the end of LinkInfo", offset);
    }
    let mut reader = &data[start..];
    let mut units = Vec::new();
    loop {
        let unit = reader.read_u16::<LittleEndian>()?;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    Ok(String::from_utf16_lossy(&units))
}

//===========================================================================//

/// A path resolver that reads `.lnk` files itself instead of asking the
/// shell.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellLinkResolver;

impl PathResolver for ShellLinkResolver {
    fn resolve_shortcut_target(&self, path: &Path) -> Option<PathBuf> {
        let link = match fs::File::open(path)
            .and_then(|file| ShellLink::read(io::BufReader::new(file)))
        {
            Ok(link) => link,
            Err(error) => {
                debug!("Can't read shortcut {:?}: {}", path, error);
                return None;
            }
        };
        match link.local_base_path() {
            Some(target) => Some(PathBuf::from(target)),
            None => {
                debug!("Shortcut {:?} has no local target", path);
                None
            }
        }
    }
}

//===========================================================================//

#[cfg(test)]
pub(crate) mod testing {
    use byteorder::{LittleEndian, WriteBytesExt};

    /// Builds a shell link whose LinkInfo points at `target`, optionally
    /// with a target ID list and a Unicode copy of the path.
    pub(crate) fn shell_link(target: &str, id_list: bool, unicode: bool) -> Vec<u8> {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(0x4C).unwrap();
        data.extend_from_slice(&super::LINK_CLSID);
        let flags = if id_list { 0x3 } else { 0x2 };
        data.write_u32::<LittleEndian>(flags).unwrap();
        data.extend_from_slice(&[0u8; 0x4C - 24]);
        if id_list {
            data.write_u16::<LittleEndian>(4).unwrap();
            data.extend_from_slice(&[0xAA, 0xBB, 0, 0]);
        }

        let header_len: u32 = if unicode { 0x24 } else { 0x1C };
        let ansi_offset = header_len;
        let ansi_len = target.len() as u32 + 1;
        let suffix_offset = ansi_offset + ansi_len;
        let unicode_offset = suffix_offset + 1;
        let wide: Vec<u16> = target.encode_utf16().chain(Some(0)).collect();
        let unicode_suffix_offset = unicode_offset + 2 * wide.len() as u32;
        let total = if unicode { unicode_suffix_offset + 2 } else { unicode_offset };

        data.write_u32::<LittleEndian>(total).unwrap();
        data.write_u32::<LittleEndian>(header_len).unwrap();
        data.write_u32::<LittleEndian>(1).unwrap();
        data.write_u32::<LittleEndian>(0).unwrap();
        data.write_u32::<LittleEndian>(ansi_offset).unwrap();
        data.write_u32::<LittleEndian>(0).unwrap();
        data.write_u32::<LittleEndian>(suffix_offset).unwrap();
        if unicode {
            data.write_u32::<LittleEndian>(unicode_offset).unwrap();
            data.write_u32::<LittleEndian>(unicode_suffix_offset).unwrap();
        }
        // The ANSI copy is mangled so that tests can tell which one was read.
        let ansi = if unicode { target.replace('\\', "/") } else { target.to_string() };
        data.extend_from_slice(ansi.as_bytes());
        data.push(0);
        data.push(0);
        if unicode {
            for unit in wide {
                data.write_u16::<LittleEndian>(unit).unwrap();
            }
            data.write_u16::<LittleEndian>(0).unwrap();
        }
        data
    }
}


//===========================================================================//
