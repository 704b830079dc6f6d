//! A library for extracting the icons of Windows executables.
//!
//! Icons live in an executable's resources as icon groups (`RT_GROUP_ICON`),
//! each listing a set of images (`RT_ICON`) of different sizes and color
//! depths.  This crate finds those images, drops the ones that are too
//! small, too shallow or malformed, ranks the rest, and either wraps them up
//! as standalone `.ico`/`.png` files or renders the one closest to a
//! requested size.
//!
//! Where the images come from, how they are decoded, and how shortcuts are
//! followed are all pluggable (see the [`ResourceProvider`],
//! [`ThumbnailProvider`], [`ImageCodec`] and [`PathResolver`] traits).  The
//! built-in [`PeFile`] provider reads resources straight out of PE files, so
//! the crate works on any platform.
//!
//! # Example
//!
//! ```no_run
//! use icoextract::{Extractor, PeFile};
//! use std::path::Path;
//!
//! let extractor = Extractor::new(PeFile);
//! let path = Path::new("app.exe");
//! if let Some(icons) = extractor.find_icons(path) {
//!     for (index, icon) in icons.iter().enumerate() {
//!         let file_name = format!("icon{}.{}", index, icon.file_extension());
//!         std::fs::write(file_name, icon.to_bytes().unwrap()).unwrap();
//!     }
//! }
//! if let Some(image) = extractor.get_best_icon(path, 48, 1.25, 0.1) {
//!     let file = std::fs::File::create("app.png").unwrap();
//!     image.write_png(file).unwrap();
//! }
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod candidate;
mod codec;
mod container;
mod error;
mod extract;
mod grpicon;
mod icondir;
mod lnk;
mod order;
mod pe;
mod provider;
mod raster;
mod restype;
mod select;
mod validate;

pub use crate::candidate::{IconCandidate, TypeHint};
pub use crate::codec::{ImageCodec, StandardCodec};
pub use crate::container::{serialize, serialize_all};
pub use crate::error::{Error, Result};
pub use crate::extract::{ExtractConfig, Extractor};
pub use crate::grpicon::{GroupIconDir, GroupIconEntry};
pub use crate::lnk::{ShellLink, ShellLinkResolver};
pub use crate::order::{order, order_by, CompareFn, IconOrder};
pub use crate::pe::{PeFile, PeModule, ResourceName};
pub use crate::provider::{
    ModuleGuard, NoThumbnails, PathResolver, ResourceProvider,
    ThumbnailProvider,
};
pub use crate::raster::IconImage;
pub use crate::restype::ResourceType;
pub use crate::select::{
    select_best, BestMatch, DEFAULT_DOWNSCALE_THRESHOLD,
    DEFAULT_UPSCALE_THRESHOLD,
};
pub use crate::validate::{validate, ValidationConfig, ValidationOutcome};
