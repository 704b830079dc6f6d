use crate::candidate::{IconCandidate, TypeHint};
use crate::codec::ImageCodec;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

//===========================================================================//

/// A caller-supplied total order over candidates.  Candidates that compare
/// less come first.
pub type CompareFn =
    dyn Fn(&IconCandidate, &IconCandidate) -> Ordering + Send + Sync;

/// How an extraction run ranks the icons it found.
#[derive(Clone, Default)]
pub enum IconOrder {
    /// PNG images first, then deeper images, then larger images.
    #[default]
    Default,
    /// A custom comparison.
    Custom(Arc<CompareFn>),
}

impl IconOrder {
    /// Wraps a comparison function.
    pub fn custom<F>(compare: F) -> IconOrder
    where
        F: Fn(&IconCandidate, &IconCandidate) -> Ordering + Send + Sync + 'static,
    {
        IconOrder::Custom(Arc::new(compare))
    }

    /// Sorts `candidates` according to this order.
    pub fn apply<C: ImageCodec + ?Sized>(
        &self,
        candidates: Vec<IconCandidate>,
        codec: &C,
    ) -> Vec<IconCandidate> {
        match *self {
            IconOrder::Default => order(candidates, codec),
            IconOrder::Custom(ref compare) => {
                order_by(candidates, |a, b| compare(a, b))
            }
        }
    }
}

impl fmt::Debug for IconOrder {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IconOrder::Default => formatter.write_str("Default"),
            IconOrder::Custom(_) => formatter.write_str("Custom(..)"),
        }
    }
}

//===========================================================================//

// Sort key of the default order; larger keys rank first.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct RankKey {
    png: bool,
    bit_count: u16,
    area: u64,
}

impl RankKey {
    fn of<C: ImageCodec + ?Sized>(candidate: &IconCandidate, codec: &C) -> RankKey {
        // The area comes from the image itself: group entries store 0 for
        // 256 and are simply wrong often enough.
        let area = match candidate
            .to_bytes()
            .and_then(|bytes| codec.decode_size(&bytes))
        {
            Ok((width, height)) => (width as u64) * (height as u64),
            Err(error) => {
                warn!(
                    "Can't measure icon {} from {}: {}",
                    candidate.entry().id,
                    candidate.origin(),
                    error
                );
                0
            }
        };
        RankKey {
            png: candidate.type_hint() == TypeHint::EncodedPng,
            bit_count: candidate.entry().bit_count,
            area,
        }
    }
}

/// Sorts candidates best-first: PNG before raw images, then by descending
/// bit depth, then by descending pixel area (as decoded by `codec`).
/// The sort is stable, so equally ranked candidates keep their input order.
pub fn order<C: ImageCodec + ?Sized>(
    candidates: Vec<IconCandidate>,
    codec: &C,
) -> Vec<IconCandidate> {
    let mut keyed: Vec<(RankKey, IconCandidate)> = candidates
        .into_iter()
        .map(|candidate| (RankKey::of(&candidate, codec), candidate))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Sorts candidates with a caller-supplied comparison (stable).
pub fn order_by<F>(mut candidates: Vec<IconCandidate>, compare: F) -> Vec<IconCandidate>
where
    F: FnMut(&IconCandidate, &IconCandidate) -> Ordering,
{
    candidates.sort_by(compare);
    candidates
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{order, order_by, IconOrder};
    use crate::candidate::{IconCandidate, PNG_SIGNATURE};
    use crate::codec::testing::bmp_resource;
    use crate::codec::StandardCodec;
    use crate::grpicon::GroupIconEntry;
    use crate::raster::IconImage;

    fn raw(origin: &str, size: u32, bit_count: u16) -> IconCandidate {
        // Deliberately wrong entry sizes: ordering must not look at them.
        let entry = GroupIconEntry {
            width: 1,
            height: 1,
            bit_count,
            ..Default::default()
        };
        IconCandidate::new(origin, entry, bmp_resource(size, size))
    }

    fn png(origin: &str, size: u32) -> IconCandidate {
        let image =
            IconImage::from_rgba_data(size, size, vec![0x7f; (size * size * 4) as usize]);
        let mut data = Vec::new();
        image.write_png(&mut data).unwrap();
        assert!(data.starts_with(PNG_SIGNATURE));
        let entry = GroupIconEntry { bit_count: 32, ..Default::default() };
        IconCandidate::new(origin, entry, data)
    }

    fn origins(candidates: &[IconCandidate]) -> Vec<&str> {
        candidates.iter().map(|candidate| candidate.origin()).collect()
    }

    #[test]
    fn png_then_depth_then_area() {
        let candidates = vec![
            raw("16x16x4", 16, 4),
            raw("32x32x32", 32, 32),
            png("png16", 16),
            raw("48x48x8", 48, 8),
            raw("48x48x32", 48, 32),
        ];
        let ordered = order(candidates, &StandardCodec);
        assert_eq!(
            origins(&ordered),
            vec!["png16", "48x48x32", "32x32x32", "48x48x8", "16x16x4"]
        );
    }

    #[test]
    fn ordering_is_stable_and_idempotent() {
        let candidates = vec![
            raw("a", 32, 32),
            raw("b", 32, 32),
            raw("c", 16, 32),
            raw("d", 32, 32),
        ];
        let ordered = order(candidates, &StandardCodec);
        assert_eq!(origins(&ordered), vec!["a", "b", "d", "c"]);
        let again = order(ordered.clone(), &StandardCodec);
        assert_eq!(again, ordered);
    }

    #[test]
    fn unmeasurable_images_sort_last_within_depth() {
        let entry = GroupIconEntry { bit_count: 32, ..Default::default() };
        let broken = IconCandidate::new("broken", entry, vec![1, 2, 3]);
        let candidates = vec![broken, raw("ok", 16, 32)];
        let ordered = order(candidates, &StandardCodec);
        assert_eq!(origins(&ordered), vec!["ok", "broken"]);
    }

    #[test]
    fn custom_order() {
        let candidates = vec![raw("big", 48, 32), raw("small", 16, 4)];
        let ordered = order_by(candidates.clone(), |a, b| {
            a.entry().bit_count.cmp(&b.entry().bit_count)
        });
        assert_eq!(origins(&ordered), vec!["small", "big"]);
        let by_name = IconOrder::custom(|a, b| b.origin().cmp(a.origin()));
        let ordered = by_name.apply(candidates, &StandardCodec);
        assert_eq!(origins(&ordered), vec!["small", "big"]);
    }
}

//===========================================================================//
