use crate::candidate::IconCandidate;
use crate::codec::{ImageCodec, StandardCodec};
use crate::grpicon::GroupIconDir;
use crate::lnk::ShellLinkResolver;
use crate::order::IconOrder;
use crate::provider::{
    ModuleGuard, NoThumbnails, PathResolver, ResourceProvider,
    ThumbnailProvider,
};
use crate::raster::IconImage;
use crate::select::select_best;
use crate::validate::{validate, ValidationConfig, ValidationOutcome};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

//===========================================================================//

// Largest associated icon ever requested for a non-executable file.
const MAX_ASSOCIATIVE_ICON_SIZE: u32 = 1024;

//===========================================================================//

/// Settings for an extraction run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractConfig {
    /// Which icon images to keep.
    pub validation: ValidationConfig,
    /// Stop after the first icon group that has any entries.  That group is
    /// almost always the application icon; later ones are for documents,
    /// toolbars and the like.
    pub enumerate_first_group_only: bool,
    /// Use the file's associated shell icon when the module has no usable
    /// icons of its own.
    pub fallback_to_associative_icon: bool,
    /// Let the shell return a thumbnail of the file's content instead of a
    /// plain icon.
    pub allow_thumbnails: bool,
    /// The size requested from the shell when falling back.
    pub fallback_icon_size: u32,
}

impl Default for ExtractConfig {
    fn default() -> ExtractConfig {
        ExtractConfig {
            validation: ValidationConfig::default(),
            enumerate_first_group_only: true,
            fallback_to_associative_icon: true,
            allow_thumbnails: true,
            fallback_icon_size: 256,
        }
    }
}

//===========================================================================//

/// Finds, filters, ranks and picks the icons of executables.
///
/// The extractor owns its collaborators and configuration and keeps no other
/// state, so one extractor can serve any number of runs.
#[derive(Clone, Debug)]
pub struct Extractor<P, T = NoThumbnails, C = StandardCodec, R = ShellLinkResolver>
{
    provider: P,
    thumbnails: T,
    codec: C,
    resolver: R,
    config: ExtractConfig,
    order: IconOrder,
}

impl<P: ResourceProvider> Extractor<P> {
    /// Creates an extractor that reads icons through `provider`, with the
    /// default configuration and the built-in codec and shortcut reader.
    pub fn new(provider: P) -> Extractor<P> {
        Extractor {
            provider,
            thumbnails: NoThumbnails,
            codec: StandardCodec,
            resolver: ShellLinkResolver,
            config: ExtractConfig::default(),
            order: IconOrder::Default,
        }
    }
}

impl<P: ResourceProvider + Default> Default for Extractor<P> {
    fn default() -> Extractor<P> {
        Extractor::new(P::default())
    }
}

impl<P, T, C, R> Extractor<P, T, C, R>
where
    P: ResourceProvider,
    T: ThumbnailProvider,
    C: ImageCodec,
    R: PathResolver,
{
    /// Replaces the thumbnail provider.
    pub fn with_thumbnails<T2: ThumbnailProvider>(
        self,
        thumbnails: T2,
    ) -> Extractor<P, T2, C, R> {
        Extractor {
            provider: self.provider,
            thumbnails,
            codec: self.codec,
            resolver: self.resolver,
            config: self.config,
            order: self.order,
        }
    }

    /// Replaces the image codec.
    pub fn with_codec<C2: ImageCodec>(self, codec: C2) -> Extractor<P, T, C2, R> {
        Extractor {
            provider: self.provider,
            thumbnails: self.thumbnails,
            codec,
            resolver: self.resolver,
            config: self.config,
            order: self.order,
        }
    }

    /// Replaces the shortcut resolver.
    pub fn with_resolver<R2: PathResolver>(
        self,
        resolver: R2,
    ) -> Extractor<P, T, C, R2> {
        Extractor {
            provider: self.provider,
            thumbnails: self.thumbnails,
            codec: self.codec,
            resolver,
            config: self.config,
            order: self.order,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the order that results are returned in.
    pub fn with_order(mut self, order: IconOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Returns the resource provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the thumbnail provider.
    pub fn thumbnails(&self) -> &T {
        &self.thumbnails
    }

    /// Collects the usable icon images of the module at `path`, best first.
    ///
    /// Returns `None` only if the module can't be opened.  A module without
    /// usable icons yields its associated shell icon when fallback is
    /// enabled, or else an empty list.
    #[instrument(skip(self))]
    pub fn find_icons(&self, path: &Path) -> Option<Vec<IconCandidate>> {
        let mut candidates = {
            let module = match ModuleGuard::open(&self.provider, path) {
                Ok(module) => module,
                Err(error) => {
                    warn!("{}", error);
                    return None;
                }
            };
            self.collect_candidates(&*module, path)
        };

        if candidates.is_empty() && self.config.fallback_to_associative_icon {
            info!("No usable icons in {:?}; using its associated icon", path);
            candidates.extend(self.thumbnails.associative_icon(
                path,
                self.config.fallback_icon_size,
                self.config.allow_thumbnails,
            ));
        }
        Some(self.order.apply(candidates, &self.codec))
    }

    fn collect_candidates(
        &self,
        module: &P::Module,
        path: &Path,
    ) -> Vec<IconCandidate> {
        let origin = path.display().to_string();
        let mut candidates = Vec::new();
        for group in self.provider.icon_groups(module) {
            let data = match self.provider.group_bytes(module, &group) {
                Ok(data) => data,
                Err(error) => {
                    warn!("Skipping icon group {:?}: {}", group, error);
                    continue;
                }
            };
            let dir = match GroupIconDir::read(&data) {
                Ok(dir) => dir,
                Err(error) => {
                    warn!("Skipping icon group {:?}: {}", group, error);
                    continue;
                }
            };
            if dir.is_empty() {
                debug!("Skipping empty icon group {:?}", group);
                continue;
            }
            debug!("Icon group {:?} lists {} image(s)", group, dir.count());
            for index in 0..dir.count() {
                let entry = match dir.entry(index) {
                    Ok(entry) => entry,
                    Err(error) => {
                        warn!(
                            "Rejected entry {} of icon group {:?}: {}",
                            index, group, error
                        );
                        continue;
                    }
                };
                let data = match self.provider.image_bytes(module, entry.id) {
                    Ok(data) => data,
                    Err(error) => {
                        warn!("Skipping entry {} of icon group {:?}: {}", index, group, error);
                        continue;
                    }
                };
                let candidate = IconCandidate::new(origin.as_str(), entry, data);
                match validate(&candidate, &self.config.validation) {
                    ValidationOutcome::Rejected(_) => {}
                    ValidationOutcome::Valid
                    | ValidationOutcome::InvalidButTolerated => {
                        candidates.push(candidate)
                    }
                }
            }
            if self.config.enumerate_first_group_only {
                break;
            }
        }
        candidates
    }

    /// Renders the icon of `path` at (about) `target_width` pixels wide.
    ///
    /// Executables are searched for their own icons, and shortcuts to
    /// executables for their target's.  Anything else gets its associated
    /// shell icon.  The closest-sized image is resized to `target_width`
    /// when it is more than `downscale_threshold` times too wide, or more
    /// than `upscale_threshold` (as a fraction of the target) too narrow.
    #[instrument(skip(self))]
    pub fn get_best_icon(
        &self,
        path: &Path,
        target_width: u32,
        downscale_threshold: f32,
        upscale_threshold: f32,
    ) -> Option<IconImage> {
        if target_width == 0 {
            debug!("Refusing to render an icon zero pixels wide");
            return None;
        }
        let candidates = match self.executable_path(path) {
            Some(exe) => self.find_icons(&exe)?,
            None => self
                .thumbnails
                .associative_icon(
                    path,
                    target_width.min(MAX_ASSOCIATIVE_ICON_SIZE),
                    self.config.allow_thumbnails,
                )
                .into_iter()
                .collect(),
        };
        let best = select_best(
            &candidates,
            &self.codec,
            target_width,
            downscale_threshold,
            upscale_threshold,
        )?;
        let image = match best
            .candidate
            .to_bytes()
            .and_then(|data| self.codec.decode(&data))
        {
            Ok(image) => image,
            Err(error) => {
                warn!("Can't decode icon from {}: {}", best.candidate.origin(), error);
                return None;
            }
        };
        if best.needs_rescale {
            debug!("Resizing {}px icon to {}px", best.width, target_width);
            Some(self.codec.resize_to_width(&image, target_width))
        } else {
            Some(image)
        }
    }

    // The executable whose icons represent `path`, if there is one.
    fn executable_path(&self, path: &Path) -> Option<PathBuf> {
        if has_extension(path, "exe") {
            return Some(path.to_path_buf());
        }
        if has_extension(path, "lnk") {
            if let Some(target) = self.resolver.resolve_shortcut_target(path) {
                if has_extension(&target, "exe") {
                    debug!("{:?} points at {:?}", path, target);
                    return Some(target);
                }
                debug!("{:?} points at non-executable {:?}", path, target);
            }
        }
        None
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{has_extension, ExtractConfig};
    use std::path::Path;

    #[test]
    fn default_config() {
        let config = ExtractConfig::default();
        assert!(config.enumerate_first_group_only);
        assert!(config.fallback_to_associative_icon);
        assert!(config.allow_thumbnails);
        assert_eq!(config.fallback_icon_size, 256);
        assert_eq!(config.validation.minimum_bit_depth, 4);
        assert_eq!(config.validation.minimum_size, 16);
    }

    #[test]
    fn extensions_ignore_case() {
        assert!(has_extension(Path::new("C:\\Apps\\Tool.EXE"), "exe"));
        assert!(has_extension(Path::new("/home/me/Desktop/app.Lnk"), "lnk"));
        assert!(!has_extension(Path::new("/home/me/notes.txt"), "exe"));
        assert!(!has_extension(Path::new("/usr/bin/exe"), "exe"));
    }
}

//===========================================================================//
