use crate::candidate::{IconCandidate, TypeHint};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

//===========================================================================//

// An ICONDIR header is 6 bytes and an ICONDIRENTRY is 16, so the single
// image of a one-entry ICO file always starts at byte 22.
const ICONDIR_LEN: u32 = 6;
const ICONDIRENTRY_LEN: u32 = 16;
const SINGLE_IMAGE_OFFSET: u32 = ICONDIR_LEN + ICONDIRENTRY_LEN;

// The ICONDIR resource type number for icons (as opposed to cursors).
const ICON_RESOURCE_TYPE: u16 = 1;

//===========================================================================//

impl IconCandidate {
    /// Writes the candidate out as a standalone image file: a single-image
    /// ICO file for raw images, or the PNG file itself for PNG payloads.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        match self.type_hint() {
            TypeHint::EncodedPng => writer.write_all(self.data()),
            TypeHint::RawImage => {
                let data_size = self.data().len();
                if data_size > (u32::MAX - SINGLE_IMAGE_OFFSET) as usize {
                    invalid_input!(
                        "Icon image data too large (was {} bytes, \
                         but max is {})",
                        data_size,
                        u32::MAX - SINGLE_IMAGE_OFFSET
                    );
                }
                let entry = self.entry();
                writer.write_u16::<LittleEndian>(0)?; // reserved
                writer.write_u16::<LittleEndian>(ICON_RESOURCE_TYPE)?;
                writer.write_u16::<LittleEndian>(1)?; // image count
                // The entry bytes are copied as-is, zero sizes included;
                // readers take the real size from the bitmap header.
                writer.write_u8(entry.width)?;
                writer.write_u8(entry.height)?;
                writer.write_u8(entry.color_count)?;
                writer.write_u8(entry.reserved)?;
                writer.write_u16::<LittleEndian>(entry.planes)?;
                writer.write_u16::<LittleEndian>(entry.bit_count)?;
                writer.write_u32::<LittleEndian>(data_size as u32)?;
                writer.write_u32::<LittleEndian>(SINGLE_IMAGE_OFFSET)?;
                writer.write_all(self.data())
            }
        }
    }

    /// Returns the bytes that [`IconCandidate::write`] would produce.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut output = match self.type_hint() {
            TypeHint::EncodedPng => Vec::with_capacity(self.data().len()),
            TypeHint::RawImage => Vec::with_capacity(
                SINGLE_IMAGE_OFFSET as usize + self.data().len(),
            ),
        };
        self.write(&mut output)?;
        Ok(output)
    }
}

//===========================================================================//

/// Serializes one candidate into a standalone ICO (or PNG) file.
pub fn serialize(candidate: &IconCandidate) -> io::Result<Vec<u8>> {
    candidate.to_bytes()
}

/// Serializes every candidate, in order.  Fails on the first candidate that
/// cannot be serialized.
pub fn serialize_all(candidates: &[IconCandidate]) -> io::Result<Vec<Vec<u8>>> {
    candidates.iter().map(serialize).collect()
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{serialize, serialize_all};
    use crate::candidate::{IconCandidate, TypeHint, PNG_SIGNATURE};
    use crate::grpicon::GroupIconEntry;

    fn entry() -> GroupIconEntry {
        GroupIconEntry {
            width: 48,
            height: 0,
            color_count: 16,
            reserved: 3,
            planes: 1,
            bit_count: 4,
            bytes_in_res: 999,
            id: 7,
        }
    }

    #[test]
    fn raw_image_layout() {
        let payload = vec![0xaau8; 5];
        let candidate = IconCandidate::with_type_hint(
            "test",
            entry(),
            TypeHint::RawImage,
            payload,
        );
        let output = serialize(&candidate).unwrap();
        let expected: &[u8] = b"\
            \x00\x00\x01\x00\x01\x00\
            \
            \x30\x00\x10\x03\x01\x00\x04\x00\
            \x05\x00\x00\x00\x16\x00\x00\x00\
            \
            \xaa\xaa\xaa\xaa\xaa";
        assert_eq!(output.as_slice(), expected);
    }

    #[test]
    fn raw_image_length_and_counts() {
        for &len in &[0usize, 1, 40, 1000] {
            let candidate = IconCandidate::with_type_hint(
                "test",
                entry(),
                TypeHint::RawImage,
                vec![0x28; len],
            );
            let output = serialize(&candidate).unwrap();
            assert_eq!(output.len(), 22 + len);
            assert_eq!(&output[4..6], &[1, 0]);
            assert_eq!(&output[6..8], &[1, 0]);
            assert_eq!(&output[22..], candidate.data());
        }
    }

    #[test]
    fn png_passthrough() {
        let mut payload = PNG_SIGNATURE.to_vec();
        payload.extend_from_slice(b"rest of the file");
        let candidate = IconCandidate::new("test", entry(), payload.clone());
        assert_eq!(candidate.type_hint(), TypeHint::EncodedPng);
        assert_eq!(serialize(&candidate).unwrap(), payload);
    }

    #[test]
    fn serialize_all_keeps_order() {
        let first = IconCandidate::new("a", entry(), vec![1, 2, 3]);
        let second = IconCandidate::new("b", entry(), PNG_SIGNATURE.to_vec());
        let outputs = serialize_all(&[first, second]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].len(), 25);
        assert_eq!(outputs[1], PNG_SIGNATURE);
    }
}

//===========================================================================//
