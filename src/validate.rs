use crate::candidate::{IconCandidate, TypeHint};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

//===========================================================================//

// Entries smaller than this are never icons, whatever the minimum size says.
const ABSOLUTE_MIN_SIZE: u32 = 8;

// What a zero-sized entry is assumed to be when treated lightly.
const TOLERATED_SIZE: u32 = 256;
const TOLERATED_BIT_COUNT: u16 = 32;

//===========================================================================//

/// Thresholds used to decide which icon images are worth keeping.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidationConfig {
    /// The minimum color depth to accept: 8 for colorful icons, 4 for
    /// Windows 95/NT style icons, 1 for monochrome toolbar icons, 0 for all.
    pub minimum_bit_depth: u16,
    /// The minimum width (and height) to accept.
    pub minimum_size: u32,
    /// Zero-sized entries at or above this depth are treated as mislabelled
    /// large icons.  `None` restricts that rule to entries whose depth is
    /// zero as well.
    pub minimum_invalid_bit_depth: Option<u16>,
    /// Whether mislabelled entries are kept (as 256x256, 32 bpp) instead of
    /// being rejected.
    pub treat_bad_icons_lightly: bool,
}

impl Default for ValidationConfig {
    fn default() -> ValidationConfig {
        ValidationConfig {
            minimum_bit_depth: 4,
            minimum_size: 16,
            minimum_invalid_bit_depth: Some(8),
            treat_bad_icons_lightly: true,
        }
    }
}

//===========================================================================//

/// The verdict for a single candidate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationOutcome {
    /// The candidate is usable.
    Valid,
    /// The candidate's metadata is broken in a known, harmless way, and it
    /// is kept anyway.
    InvalidButTolerated,
    /// The candidate should be dropped, for the given reason.
    Rejected(String),
}

impl ValidationOutcome {
    /// Returns true unless the candidate was rejected.
    pub fn is_accepted(&self) -> bool {
        !matches!(*self, ValidationOutcome::Rejected(_))
    }
}

//===========================================================================//

/// Decides whether a candidate should be kept.
///
/// PNG payloads are always accepted.  For raw images the decision rests on
/// the group directory entry alone: the image must be square, at least
/// `minimum_size` wide and at least `minimum_bit_depth` deep.  Entries that
/// claim to be 0x0 (with a depth of zero, or of at least
/// `minimum_invalid_bit_depth`) are a well-known artifact of 256x256 icons
/// and are judged as 256x256 at 32 bpp when `treat_bad_icons_lightly` is
/// set; the entry itself is left untouched.
pub fn validate(
    candidate: &IconCandidate,
    config: &ValidationConfig,
) -> ValidationOutcome {
    if candidate.type_hint() == TypeHint::EncodedPng {
        return ValidationOutcome::Valid;
    }
    let entry = candidate.entry();
    let mut width = entry.width as u32;
    let mut height = entry.height as u32;
    let mut bit_count = entry.bit_count;
    let anomalous = width == 0
        && height == 0
        && (bit_count == 0
            || config
                .minimum_invalid_bit_depth
                .map_or(false, |depth| bit_count >= depth));
    if anomalous {
        if !config.treat_bad_icons_lightly {
            debug!(
                "Invalid icon: {}x{}, {}-bit (ID: {})",
                entry.width, entry.height, entry.bit_count, entry.id
            );
            return ValidationOutcome::Rejected(format!(
                "zero-sized {}-bit entry {}",
                entry.bit_count, entry.id
            ));
        }
        width = TOLERATED_SIZE;
        height = TOLERATED_SIZE;
        bit_count = TOLERATED_BIT_COUNT;
    }

    let valid_dimensions = width >= ABSOLUTE_MIN_SIZE
        && height >= ABSOLUTE_MIN_SIZE
        && width == height
        && width >= config.minimum_size;
    let valid_bit_depth = bit_count >= config.minimum_bit_depth;

    if valid_dimensions && valid_bit_depth {
        debug!(
            "Valid icon: {}x{}, {}-bit (ID: {})",
            entry.width, entry.height, entry.bit_count, entry.id
        );
        if anomalous {
            ValidationOutcome::InvalidButTolerated
        } else {
            ValidationOutcome::Valid
        }
    } else {
        debug!(
            "{} icon: {}x{}, {}-bit (ID: {})",
            if anomalous { "Invalid" } else { "Ignored" },
            entry.width,
            entry.height,
            entry.bit_count,
            entry.id
        );
        let reason = if !valid_dimensions {
            format!("unwanted dimensions {}x{}", width, height)
        } else {
            format!(
                "bit depth {} is below {}",
                bit_count, config.minimum_bit_depth
            )
        };
        ValidationOutcome::Rejected(reason)
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{validate, ValidationConfig, ValidationOutcome};
    use crate::candidate::{IconCandidate, TypeHint};
    use crate::grpicon::GroupIconEntry;

    fn raw(width: u8, height: u8, bit_count: u16) -> IconCandidate {
        let entry = GroupIconEntry {
            width,
            height,
            bit_count,
            planes: 1,
            id: 1,
            ..Default::default()
        };
        IconCandidate::with_type_hint("test", entry, TypeHint::RawImage, vec![])
    }

    #[test]
    fn square_deep_icons_are_valid() {
        let config = ValidationConfig::default();
        for &size in &[16u8, 24, 32, 48, 64, 128, 255] {
            for &bits in &[4u16, 8, 24, 32] {
                assert_eq!(
                    validate(&raw(size, size, bits), &config),
                    ValidationOutcome::Valid,
                    "{}x{} at {} bpp",
                    size,
                    size,
                    bits
                );
            }
        }
    }

    #[test]
    fn small_shallow_or_oblong_icons_are_rejected() {
        let config = ValidationConfig::default();
        assert!(!validate(&raw(8, 8, 32), &config).is_accepted());
        assert!(!validate(&raw(15, 15, 32), &config).is_accepted());
        assert!(!validate(&raw(32, 32, 1), &config).is_accepted());
        assert!(!validate(&raw(32, 16, 32), &config).is_accepted());
        assert!(!validate(&raw(0, 32, 32), &config).is_accepted());
    }

    #[test]
    fn minimum_size_never_goes_below_eight() {
        let config = ValidationConfig {
            minimum_size: 0,
            minimum_bit_depth: 0,
            ..ValidationConfig::default()
        };
        assert_eq!(validate(&raw(8, 8, 1), &config), ValidationOutcome::Valid);
        assert!(!validate(&raw(7, 7, 1), &config).is_accepted());
    }

    #[test]
    fn zero_sized_zero_depth_is_tolerated() {
        let config = ValidationConfig::default();
        assert_eq!(
            validate(&raw(0, 0, 0), &config),
            ValidationOutcome::InvalidButTolerated
        );
    }

    #[test]
    fn zero_sized_deep_is_tolerated() {
        let config = ValidationConfig::default();
        assert_eq!(
            validate(&raw(0, 0, 8), &config),
            ValidationOutcome::InvalidButTolerated
        );
        assert_eq!(
            validate(&raw(0, 0, 32), &config),
            ValidationOutcome::InvalidButTolerated
        );
    }

    #[test]
    fn zero_sized_shallow_is_judged_as_is() {
        // Depths between 1 and minimum_invalid_bit_depth - 1 are not
        // anomalous, so the 0x0 size is checked literally.
        let config = ValidationConfig::default();
        assert!(!validate(&raw(0, 0, 4), &config).is_accepted());
        let config = ValidationConfig {
            minimum_invalid_bit_depth: None,
            ..ValidationConfig::default()
        };
        assert!(!validate(&raw(0, 0, 32), &config).is_accepted());
        assert_eq!(
            validate(&raw(0, 0, 0), &config),
            ValidationOutcome::InvalidButTolerated
        );
    }

    #[test]
    fn strict_mode_rejects_anomalies() {
        let config = ValidationConfig {
            treat_bad_icons_lightly: false,
            ..ValidationConfig::default()
        };
        assert!(!validate(&raw(0, 0, 0), &config).is_accepted());
        assert!(!validate(&raw(0, 0, 32), &config).is_accepted());
        assert_eq!(validate(&raw(48, 48, 32), &config), ValidationOutcome::Valid);
    }

    #[test]
    fn tolerated_icons_still_face_the_thresholds() {
        let config = ValidationConfig {
            minimum_size: 512,
            ..ValidationConfig::default()
        };
        assert!(!validate(&raw(0, 0, 0), &config).is_accepted());
    }

    #[test]
    fn png_is_always_valid() {
        let entry = GroupIconEntry { width: 1, height: 3, ..Default::default() };
        let candidate = IconCandidate::with_type_hint(
            "test",
            entry,
            TypeHint::EncodedPng,
            vec![],
        );
        let config = ValidationConfig {
            treat_bad_icons_lightly: false,
            ..ValidationConfig::default()
        };
        assert_eq!(validate(&candidate, &config), ValidationOutcome::Valid);
    }

    #[test]
    fn entry_is_not_modified() {
        let candidate = raw(0, 0, 0);
        let _ = validate(&candidate, &ValidationConfig::default());
        assert_eq!(candidate.entry().width, 0);
        assert_eq!(candidate.entry().bit_count, 0);
    }
}

//===========================================================================//
