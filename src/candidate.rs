use crate::error::{Error, Result};
use crate::grpicon::GroupIconEntry;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

// The signature that all PNG files start with.
pub(crate) const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
/// How an icon image's payload is encoded.
pub enum TypeHint {
    /// A BMP-style device-independent bitmap, which needs an ICO header
    /// before anything can read it.
    RawImage,
    /// A complete PNG file, usable as-is.
    EncodedPng,
}

impl TypeHint {
    /// Picks the type hint for a payload by looking for the PNG signature.
    pub fn sniff(data: &[u8]) -> TypeHint {
        if data.starts_with(PNG_SIGNATURE) {
            TypeHint::EncodedPng
        } else {
            TypeHint::RawImage
        }
    }

    /// Converts a numeric hint (0 for raw images, 1 for PNG) back into a
    /// type hint.
    pub fn from_number(number: u8) -> Result<TypeHint> {
        match number {
            0 => Ok(TypeHint::RawImage),
            1 => Ok(TypeHint::EncodedPng),
            _ => Err(Error::UnsupportedTypeHint(number)),
        }
    }

    /// Returns the numeric form of this hint.
    pub fn number(&self) -> u8 {
        match *self {
            TypeHint::RawImage => 0,
            TypeHint::EncodedPng => 1,
        }
    }
}

//===========================================================================//

/// One icon image found in a module (or produced by a thumbnail provider),
/// which may or may not end up being used.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct IconCandidate {
    entry: GroupIconEntry,
    data: Vec<u8>,
    type_hint: TypeHint,
    origin: String,
}

impl IconCandidate {
    /// Creates a candidate, choosing the type hint from the payload's magic
    /// bytes.
    pub fn new<S: Into<String>>(
        origin: S,
        entry: GroupIconEntry,
        data: Vec<u8>,
    ) -> IconCandidate {
        let type_hint = TypeHint::sniff(&data);
        IconCandidate::with_type_hint(origin, entry, type_hint, data)
    }

    /// Creates a candidate with an explicit type hint.
    pub fn with_type_hint<S: Into<String>>(
        origin: S,
        entry: GroupIconEntry,
        type_hint: TypeHint,
        data: Vec<u8>,
    ) -> IconCandidate {
        IconCandidate { entry, data, type_hint, origin: origin.into() }
    }

    /// Returns the group directory entry this image was listed under.
    pub fn entry(&self) -> &GroupIconEntry {
        &self.entry
    }

    /// Returns the raw, encoded image data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns how the image data is encoded.
    pub fn type_hint(&self) -> TypeHint {
        self.type_hint
    }

    /// Returns true if the image data is a complete PNG file.
    pub fn is_png(&self) -> bool {
        self.type_hint == TypeHint::EncodedPng
    }

    /// Returns where this candidate came from (normally a file path).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the file extension that the serialized candidate should be
    /// saved with.
    pub fn file_extension(&self) -> &'static str {
        match self.type_hint {
            TypeHint::RawImage => "ico",
            TypeHint::EncodedPng => "png",
        }
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{IconCandidate, TypeHint, PNG_SIGNATURE};
    use crate::error::Error;
    use crate::grpicon::GroupIconEntry;

    #[test]
    fn sniff_png_signature() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(b"\x00\x00\x00\x0dIHDR");
        assert_eq!(TypeHint::sniff(&data), TypeHint::EncodedPng);
        assert_eq!(TypeHint::sniff(b"\x28\x00\x00\x00"), TypeHint::RawImage);
        assert_eq!(TypeHint::sniff(b"\x89PNG"), TypeHint::RawImage);
        assert_eq!(TypeHint::sniff(b""), TypeHint::RawImage);
    }

    #[test]
    fn type_hint_numbers() {
        for &hint in &[TypeHint::RawImage, TypeHint::EncodedPng] {
            assert_eq!(TypeHint::from_number(hint.number()).unwrap(), hint);
        }
        match TypeHint::from_number(7) {
            Err(Error::UnsupportedTypeHint(7)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn candidate_accessors() {
        let entry = GroupIconEntry { width: 32, height: 32, ..Default::default() };
        let candidate =
            IconCandidate::new("app.exe", entry, vec![0x28, 0, 0, 0]);
        assert_eq!(candidate.origin(), "app.exe");
        assert_eq!(candidate.entry().width, 32);
        assert!(!candidate.is_png());
        assert_eq!(candidate.file_extension(), "ico");
        assert_eq!(candidate.data(), &[0x28, 0, 0, 0]);
    }
}

//===========================================================================//
