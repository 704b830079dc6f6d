use crate::candidate::IconCandidate;
use crate::error::Result;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};

//===========================================================================//

/// A source of icon resources, such as a PE file on disk or the resource
/// loader of an operating system.
pub trait ResourceProvider {
    /// An open module.
    type Module;

    /// Identifies one icon group resource within a module.
    type GroupId: fmt::Debug;

    /// Opens the module at `path`.  Fails with
    /// [`Error::ModuleLoadFailed`](crate::Error::ModuleLoadFailed).
    fn open(&self, path: &Path) -> Result<Self::Module>;

    /// Lists the icon groups of a module, in the module's own order.
    fn icon_groups(&self, module: &Self::Module) -> Vec<Self::GroupId>;

    /// Fetches the raw bytes of an icon group directory.
    fn group_bytes(
        &self,
        module: &Self::Module,
        group: &Self::GroupId,
    ) -> Result<Vec<u8>>;

    /// Fetches the payload of the icon resource with the given id.  Fails
    /// with [`Error::IconResourceNotFound`](crate::Error::IconResourceNotFound)
    /// if there is no such resource.
    fn image_bytes(&self, module: &Self::Module, id: u16) -> Result<Vec<u8>>;

    /// Releases a module.
    fn close(&self, module: Self::Module);
}

/// Asks the platform shell for the icon it would show for a file.
pub trait ThumbnailProvider {
    /// Returns the shell's icon for `path` at `size` pixels, or a thumbnail
    /// of the file's content if `allow_thumbnail` is set and the shell has
    /// one.
    fn associative_icon(
        &self,
        path: &Path,
        size: u32,
        allow_thumbnail: bool,
    ) -> Option<IconCandidate>;
}

/// Resolves shortcut files to the files they point at.
pub trait PathResolver {
    /// Returns the target of the shortcut at `path`, if it has one.
    fn resolve_shortcut_target(&self, path: &Path) -> Option<PathBuf>;
}

//===========================================================================//

/// A thumbnail provider for platforms without a shell: it never has an icon.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoThumbnails;

impl ThumbnailProvider for NoThumbnails {
    fn associative_icon(
        &self,
        _path: &Path,
        _size: u32,
        _allow_thumbnail: bool,
    ) -> Option<IconCandidate> {
        None
    }
}

//===========================================================================//

/// An open module that is handed back to its provider when dropped.
pub struct ModuleGuard<'a, P: ResourceProvider + ?Sized> {
    provider: &'a P,
    module: Option<P::Module>,
}

impl<'a, P: ResourceProvider + ?Sized> ModuleGuard<'a, P> {
    /// Opens `path` with `provider`.
    pub fn open(provider: &'a P, path: &Path) -> Result<ModuleGuard<'a, P>> {
        let module = provider.open(path)?;
        Ok(ModuleGuard { provider, module: Some(module) })
    }
}

impl<'a, P: ResourceProvider + ?Sized> Deref for ModuleGuard<'a, P> {
    type Target = P::Module;

    fn deref(&self) -> &P::Module {
        match self.module {
            Some(ref module) => module,
            // Only taken in drop().
            None => unreachable!("module already closed"),
        }
    }
}

impl<'a, P: ResourceProvider + ?Sized> Drop for ModuleGuard<'a, P> {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            self.provider.close(module);
        }
    }
}

//===========================================================================//


//===========================================================================//
