use crate::candidate::IconCandidate;
use crate::codec::ImageCodec;
use tracing::{debug, warn};

//===========================================================================//

/// How far above the target width an icon may be before it gets scaled
/// down (as a ratio of the target).
pub const DEFAULT_DOWNSCALE_THRESHOLD: f32 = 1.25;

/// How far below the target width an icon may be before it gets scaled up
/// (as a fraction of the target).
pub const DEFAULT_UPSCALE_THRESHOLD: f32 = 0.1;

//===========================================================================//

/// The candidate closest to a requested width.
#[derive(Clone, Copy, Debug)]
pub struct BestMatch<'a> {
    /// The chosen candidate.
    pub candidate: &'a IconCandidate,
    /// Its real width, in pixels.
    pub width: u32,
    /// Whether it must be resized to the target width before use.
    pub needs_rescale: bool,
}

/// Picks the candidate whose real width is closest to `target_width`,
/// preferring the larger image on a tie, and works out whether it needs
/// rescaling.
///
/// The width/target ratio is computed in floating point.  An image is
/// rescaled when the ratio exceeds `downscale_threshold`, or when it falls
/// short of 1 by more than `upscale_threshold`.  Candidates the codec can't
/// measure are passed over; `None` means nothing could be measured.
pub fn select_best<'a, C: ImageCodec + ?Sized>(
    candidates: &'a [IconCandidate],
    codec: &C,
    target_width: u32,
    downscale_threshold: f32,
    upscale_threshold: f32,
) -> Option<BestMatch<'a>> {
    let mut best: Option<(&IconCandidate, u32, u32)> = None;
    for candidate in candidates {
        let measured = candidate
            .to_bytes()
            .and_then(|bytes| codec.decode_size(&bytes));
        let width = match measured {
            Ok((width, _)) => width,
            Err(error) => {
                warn!(
                    "Can't measure icon {} from {}: {}",
                    candidate.entry().id,
                    candidate.origin(),
                    error
                );
                continue;
            }
        };
        let diff = width.abs_diff(target_width);
        let better = match best {
            None => true,
            Some((_, best_width, best_diff)) => {
                diff < best_diff || (diff == best_diff && width > best_width)
            }
        };
        if better {
            best = Some((candidate, width, diff));
        }
    }

    let (candidate, width, _) = best?;
    let ratio = width as f64 / target_width as f64;
    let needs_rescale = ratio > downscale_threshold as f64
        || (1.0 - ratio) > upscale_threshold as f64;
    debug!(
        "Best icon for width {} is {} wide (rescale: {})",
        target_width, width, needs_rescale
    );
    Some(BestMatch { candidate, width, needs_rescale })
}

//===========================================================================//


//===========================================================================//
