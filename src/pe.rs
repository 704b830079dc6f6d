//! Reading icon resources straight out of Portable Executable files.

use crate::error::{Error, Result};
use crate::provider::ResourceProvider;
use crate::restype::ResourceType;
use byteorder::{LittleEndian, ReadBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

//===========================================================================//

// Where the MZ header keeps the offset of the PE header.
const PE_HEADER_OFFSET_OFFSET: u64 = 0x3C;
const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const COFF_HEADER_LEN: u64 = 20;
const SECTION_HEADER_LEN: usize = 40;

const PE32_MAGIC: u16 = 0x010B;
const PE32_PLUS_MAGIC: u16 = 0x020B;
const RESOURCE_DATA_DIRECTORY_INDEX: u32 = 2;

// The high bit of a resource directory entry field marks a name (in the
// first field) or a subdirectory (in the second).
const RESOURCE_FLAG: u32 = 0x8000_0000;

//===========================================================================//

/// The name of a resource in a PE file: either a string or an integer id.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ResourceName {
    /// A named resource.
    Name(String),
    /// A resource identified by number.
    Id(u32),
}

impl fmt::Display for ResourceName {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ResourceName::Name(ref name) => formatter.write_str(name),
            ResourceName::Id(id) => write!(formatter, "#{}", id),
        }
    }
}

//===========================================================================//

#[derive(Clone, Copy, Debug)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_pointer: u32,
}

impl Section {
    fn read<R: Read>(reader: &mut R) -> io::Result<Section> {
        let mut name = [0u8; 8];
        reader.read_exact(&mut name)?;
        let virtual_size = reader.read_u32::<LittleEndian>()?;
        let virtual_address = reader.read_u32::<LittleEndian>()?;
        let raw_size = reader.read_u32::<LittleEndian>()?;
        let raw_pointer = reader.read_u32::<LittleEndian>()?;
        let mut rest = [0u8; SECTION_HEADER_LEN - 24];
        reader.read_exact(&mut rest)?;
        Ok(Section { virtual_address, virtual_size, raw_size, raw_pointer })
    }
}

// Translates relative virtual addresses into file offsets.
#[derive(Clone, Debug, Default)]
struct SectionTable {
    sections: Vec<Section>,
}

impl SectionTable {
    fn virtual_to_raw(&self, address: u32) -> Option<u32> {
        for section in &self.sections {
            // Some linkers leave the virtual size at zero.
            let span = if section.virtual_size == 0 {
                section.raw_size
            } else {
                section.virtual_size
            };
            let start = section.virtual_address;
            if address >= start && (address - start) < span {
                let offset = address - start;
                if offset >= section.raw_size {
                    return None;
                }
                return section.raw_pointer.checked_add(offset);
            }
        }
        None
    }
}

//===========================================================================//

#[derive(Clone, Debug)]
struct DirectoryEntry {
    name: ResourceName,
    target: u32,
}

impl DirectoryEntry {
    fn is_subdirectory(&self) -> bool {
        self.target & RESOURCE_FLAG != 0
    }

    fn target_offset(&self) -> u32 {
        self.target & !RESOURCE_FLAG
    }
}

// The resource section of a file, as seen through its section table.
struct ResourceTree<'a> {
    cursor: Cursor<&'a [u8]>,
    sections: &'a SectionTable,
    base: u32,
}

impl<'a> ResourceTree<'a> {
    fn seek_virtual(&mut self, address: u32) -> io::Result<()> {
        match self.sections.virtual_to_raw(address) {
            Some(raw) => {
                self.cursor.seek(SeekFrom::Start(raw as u64))?;
                Ok(())
            }
            None => invalid_data!(
                "Resource address {:#010X} is outside every section",
                address
            ),
        }
    }

    // Reads the directory table at `offset` from the start of the resource
    // section.  Named entries come first, then integer ids.
    fn read_directory(&mut self, offset: u32) -> io::Result<Vec<DirectoryEntry>> {
        self.seek_virtual(self.base.wrapping_add(offset))?;
        let mut header = [0u8; 12];
        self.cursor.read_exact(&mut header)?;
        let num_named = self.cursor.read_u16::<LittleEndian>()?;
        let num_ids = self.cursor.read_u16::<LittleEndian>()?;
        let mut raw_entries = Vec::with_capacity(num_named as usize + num_ids as usize);
        for _ in 0..(num_named as usize + num_ids as usize) {
            let name = self.cursor.read_u32::<LittleEndian>()?;
            let target = self.cursor.read_u32::<LittleEndian>()?;
            raw_entries.push((name, target));
        }
        let mut entries = Vec::with_capacity(raw_entries.len());
        for (name, target) in raw_entries {
            let name = if name & RESOURCE_FLAG != 0 {
                ResourceName::Name(self.read_name(name & !RESOURCE_FLAG)?)
            } else {
                ResourceName::Id(name)
            };
            entries.push(DirectoryEntry { name, target });
        }
        Ok(entries)
    }

    // Reads a length-prefixed UTF-16 resource name.
    fn read_name(&mut self, offset: u32) -> io::Result<String> {
        self.seek_virtual(self.base.wrapping_add(offset))?;
        let length = self.cursor.read_u16::<LittleEndian>()?;
        let mut units = Vec::with_capacity(length as usize);
        for _ in 0..length {
            units.push(self.cursor.read_u16::<LittleEndian>()?);
        }
        Ok(String::from_utf16_lossy(&units))
    }

    // Reads a data entry and returns the file range of the data it points at.
    fn read_data_entry(&mut self, offset: u32) -> io::Result<Range<usize>> {
        self.seek_virtual(self.base.wrapping_add(offset))?;
        let data_rva = self.cursor.read_u32::<LittleEndian>()?;
        let size = self.cursor.read_u32::<LittleEndian>()?;
        let _codepage = self.cursor.read_u32::<LittleEndian>()?;
        let _reserved = self.cursor.read_u32::<LittleEndian>()?;
        let start = match self.sections.virtual_to_raw(data_rva) {
            Some(start) => start as usize,
            None => invalid_data!(
                "Resource data at {:#010X} is outside every section",
                data_rva
            ),
        };
        let end = match start.checked_add(size as usize) {
            Some(end) if end <= self.cursor.get_ref().len() => end,
            _ => invalid_data!(
                "Resource data at {:#010X} runs past the end of the file \
                 ({} bytes)",
                data_rva,
                size
            ),
        };
        Ok(start..end)
    }

    // Finds the data of one named resource, through its first language.
    fn read_resource(
        &mut self,
        name_entry: &DirectoryEntry,
    ) -> io::Result<Option<Range<usize>>> {
        if !name_entry.is_subdirectory() {
            invalid_data!("Resource has no language directory");
        }
        let languages = self.read_directory(name_entry.target_offset())?;
        match languages.first() {
            Some(language) if !language.is_subdirectory() => {
                Ok(Some(self.read_data_entry(language.target_offset())?))
            }
            Some(_) => invalid_data!("Resource nests too deeply"),
            None => Ok(None),
        }
    }

    // Lists the resources of one type, using the first language of each.
    // Resources that can't be read are left out, so that asking for them
    // later fails for that resource alone.
    fn resources_of_type(
        &mut self,
        root: &[DirectoryEntry],
        restype: ResourceType,
    ) -> io::Result<Vec<(ResourceName, Range<usize>)>> {
        let type_entry = match root
            .iter()
            .find(|entry| entry.name == ResourceName::Id(restype.number()))
        {
            Some(entry) if entry.is_subdirectory() => entry.clone(),
            Some(_) => invalid_data!("{:?} entry is not a directory", restype),
            None => return Ok(Vec::new()),
        };
        let names = self.read_directory(type_entry.target_offset())?;
        let mut resources = Vec::with_capacity(names.len());
        for name_entry in names {
            match self.read_resource(&name_entry) {
                Ok(Some(range)) => resources.push((name_entry.name, range)),
                Ok(None) => {
                    debug!("{:?} resource {} has no data", restype, name_entry.name)
                }
                Err(error) => warn!(
                    "Skipping {:?} resource {}: {}",
                    restype, name_entry.name, error
                ),
            }
        }
        Ok(resources)
    }
}

//===========================================================================//

/// The icon resources of a PE file, loaded into memory.
pub struct PeModule {
    path: PathBuf,
    data: Vec<u8>,
    groups: Vec<(ResourceName, Range<usize>)>,
    icons: Vec<(u32, Range<usize>)>,
}

impl PeModule {
    /// Parses the icon resources out of the bytes of a PE file.  The `path`
    /// is only used in messages.
    pub fn parse<P: Into<PathBuf>>(path: P, data: Vec<u8>) -> io::Result<PeModule> {
        let (sections, resource_rva) = {
            let mut cursor = Cursor::new(data.as_slice());
            let mut magic = [0u8; 2];
            cursor.read_exact(&mut magic)?;
            if &magic != b"MZ" {
                invalid_data!("Not an executable (missing MZ signature)");
            }
            cursor.seek(SeekFrom::Start(PE_HEADER_OFFSET_OFFSET))?;
            let pe_offset = cursor.read_u32::<LittleEndian>()? as u64;
            cursor.seek(SeekFrom::Start(pe_offset))?;
            let mut signature = [0u8; 4];
            cursor.read_exact(&mut signature)?;
            if &signature != PE_SIGNATURE {
                invalid_data!("Not a PE file (missing PE signature)");
            }
            let _machine = cursor.read_u16::<LittleEndian>()?;
            let num_sections = cursor.read_u16::<LittleEndian>()?;
            cursor.seek(SeekFrom::Current(12))?;
            let optional_header_size = cursor.read_u16::<LittleEndian>()? as u64;
            let _characteristics = cursor.read_u16::<LittleEndian>()?;

            let optional_start = pe_offset + 4 + COFF_HEADER_LEN;
            let resource_rva = read_resource_rva(&mut cursor, optional_header_size)?;

            cursor.seek(SeekFrom::Start(optional_start + optional_header_size))?;
            let mut sections = Vec::with_capacity(num_sections as usize);
            for _ in 0..num_sections {
                sections.push(Section::read(&mut cursor)?);
            }
            (SectionTable { sections }, resource_rva)
        };

        let path = path.into();
        let resource_rva = match resource_rva {
            Some(rva) => rva,
            None => {
                debug!("{:?} has no resources", path);
                return Ok(PeModule {
                    path,
                    data,
                    groups: Vec::new(),
                    icons: Vec::new(),
                });
            }
        };
        let (groups, icons) = {
            let mut tree = ResourceTree {
                cursor: Cursor::new(data.as_slice()),
                sections: &sections,
                base: resource_rva,
            };
            let root = tree.read_directory(0)?;
            let groups = tree.resources_of_type(&root, ResourceType::GroupIcon)?;
            let mut icons = Vec::new();
            for (name, range) in tree.resources_of_type(&root, ResourceType::Icon)? {
                match name {
                    ResourceName::Id(id) => icons.push((id, range)),
                    ResourceName::Name(name) => {
                        debug!("Ignoring icon resource named {:?}", name)
                    }
                }
            }
            (groups, icons)
        };
        debug!(
            "{:?}: {} icon group(s), {} icon image(s)",
            path,
            groups.len(),
            icons.len()
        );
        Ok(PeModule { path, data, groups, icons })
    }

    /// Returns the path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the bytes of an icon group resource.
    pub fn group(&self, name: &ResourceName) -> Option<&[u8]> {
        self.groups
            .iter()
            .find(|&&(ref group, _)| group == name)
            .map(|&(_, ref range)| &self.data[range.clone()])
    }

    /// Returns the bytes of an icon image resource.
    pub fn icon(&self, id: u16) -> Option<&[u8]> {
        self.icons
            .iter()
            .find(|&&(icon, _)| icon == id as u32)
            .map(|&(_, ref range)| &self.data[range.clone()])
    }
}

impl fmt::Debug for PeModule {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("PeModule")
            .field("path", &self.path)
            .field("groups", &self.groups)
            .field("icons", &self.icons.len())
            .finish()
    }
}

// Reads the optional header far enough to find the resource directory.
// Returns `None` if the file has no resource directory.
fn read_resource_rva<R: Read + Seek>(
    reader: &mut R,
    optional_header_size: u64,
) -> io::Result<Option<u32>> {
    if optional_header_size < 2 {
        return Ok(None);
    }
    let magic = reader.read_u16::<LittleEndian>()?;
    // Offsets of NumberOfRvaAndSizes, relative to the optional header.
    let count_offset: u64 = match magic {
        PE32_MAGIC => 92,
        PE32_PLUS_MAGIC => 108,
        _ => invalid_data!("Unknown optional header magic ({:#06X})", magic),
    };
    if optional_header_size < count_offset + 4 {
        return Ok(None);
    }
    reader.seek(SeekFrom::Current(count_offset as i64 - 2))?;
    let num_directories = reader.read_u32::<LittleEndian>()?;
    let directory_end =
        count_offset + 4 + 8 * (RESOURCE_DATA_DIRECTORY_INDEX as u64 + 1);
    if num_directories <= RESOURCE_DATA_DIRECTORY_INDEX
        || optional_header_size < directory_end
    {
        return Ok(None);
    }
    reader.seek(SeekFrom::Current(8 * RESOURCE_DATA_DIRECTORY_INDEX as i64))?;
    let address = reader.read_u32::<LittleEndian>()?;
    let size = reader.read_u32::<LittleEndian>()?;
    if address == 0 || size == 0 {
        return Ok(None);
    }
    Ok(Some(address))
}

//===========================================================================//

/// A resource provider that reads icons out of PE files on disk (`.exe`,
/// `.dll`, and so on), on any platform.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeFile;

impl ResourceProvider for PeFile {
    type Module = PeModule;
    type GroupId = ResourceName;

    fn open(&self, path: &Path) -> Result<PeModule> {
        let load_failed = |error: io::Error| Error::ModuleLoadFailed {
            path: path.to_path_buf(),
            reason: error.to_string(),
        };
        let data = fs::read(path).map_err(load_failed)?;
        PeModule::parse(path, data).map_err(load_failed)
    }

    fn icon_groups(&self, module: &PeModule) -> Vec<ResourceName> {
        module.groups.iter().map(|&(ref name, _)| name.clone()).collect()
    }

    fn group_bytes(
        &self,
        module: &PeModule,
        group: &ResourceName,
    ) -> Result<Vec<u8>> {
        match module.group(group) {
            Some(data) => Ok(data.to_vec()),
            None => Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No icon group {} in {:?}", group, module.path),
            ))),
        }
    }

    fn image_bytes(&self, module: &PeModule, id: u16) -> Result<Vec<u8>> {
        module
            .icon(id)
            .map(|data| data.to_vec())
            .ok_or(Error::IconResourceNotFound(id))
    }

    fn close(&self, module: PeModule) {
        debug!("Closing {:?}", module.path);
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{PeFile, PeModule, ResourceName, Section, SectionTable};
    use crate::error::Error;
    use crate::provider::ResourceProvider;
    use std::path::Path;

    #[test]
    fn virtual_to_raw() {
        let sections = SectionTable {
            sections: vec![
                Section {
                    virtual_address: 0x1000,
                    virtual_size: 0x2000,
                    raw_size: 0x200,
                    raw_pointer: 0x400,
                },
                Section {
                    virtual_address: 0x4000,
                    virtual_size: 0,
                    raw_size: 0x100,
                    raw_pointer: 0x600,
                },
            ],
        };
        assert_eq!(sections.virtual_to_raw(0x1000), Some(0x400));
        assert_eq!(sections.virtual_to_raw(0x11ff), Some(0x5ff));
        // Inside the section in memory, but past its data in the file.
        assert_eq!(sections.virtual_to_raw(0x1200), None);
        assert_eq!(sections.virtual_to_raw(0x4080), Some(0x680));
        assert_eq!(sections.virtual_to_raw(0x4100), None);
        assert_eq!(sections.virtual_to_raw(0x0fff), None);
    }

    #[test]
    fn resource_name_display() {
        assert_eq!(ResourceName::Id(101).to_string(), "#101");
        assert_eq!(ResourceName::Name("MAINICON".to_string()).to_string(), "MAINICON");
    }

    #[test]
    fn reject_non_executables() {
        assert!(PeModule::parse("empty", Vec::new()).is_err());
        assert!(PeModule::parse("text", b"just some text".to_vec()).is_err());
        let mut mz_only = vec![0u8; 0x80];
        mz_only[0..2].copy_from_slice(b"MZ");
        mz_only[0x3c] = 0x40;
        assert!(PeModule::parse("dos", mz_only).is_err());
    }

    #[test]
    fn open_missing_file() {
        let path = Path::new("/nonexistent/dir/app.exe");
        match PeFile.open(path) {
            Err(Error::ModuleLoadFailed { path: failed, .. }) => {
                assert_eq!(failed, path);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}

//===========================================================================//
