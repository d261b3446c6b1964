//! Asset resolver interface.
//!
//! The navigation runtime does not load assets itself. Applications inject
//! an [`AssetResolver`]; screens fetch through
//! [`ScreenContext::load_asset`](crate::screen::ScreenContext::load_asset),
//! which ties every loaded handle to the screen's disposal scope so it is
//! released when the screen is popped.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::AssetError;

/// An external asset loader.
///
/// Timeout policy belongs to the resolver; it reports expiry as
/// [`AssetError::LoadTimeout`].
pub trait AssetResolver: Send + Sync + 'static {
    /// Load the asset registered under `key`.
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<AssetHandle, AssetError>>;

    /// Release a handle previously returned by [`load`](Self::load).
    fn release(&self, handle: &AssetHandle);
}

/// A loaded asset, shared by reference count.
#[derive(Clone)]
pub struct AssetHandle {
    key: Arc<str>,
    asset: Arc<dyn Any + Send + Sync>,
}

impl AssetHandle {
    /// Wrap a loaded asset.
    pub fn new<T: Any + Send + Sync>(key: impl Into<Arc<str>>, asset: T) -> Self {
        Self {
            key: key.into(),
            asset: Arc::new(asset),
        }
    }

    /// The key the asset was loaded under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the asset as `T`, if it has that type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.asset.downcast_ref::<T>()
    }

    /// Share the asset as `Arc<T>`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>, AssetError> {
        self.asset
            .clone()
            .downcast::<T>()
            .map_err(|_| AssetError::TypeMismatch {
                key: self.key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}

impl fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle").field("key", &self.key).finish()
    }
}
