//! Object factories used by the pool to create and destroy pooled objects

use std::fmt;
use std::marker::PhantomData;

use crate::errors::FactoryError;

/// Creates, resets, validates and destroys the objects held by a pool.
///
/// Only [`new_instance`](ObjectFactory::new_instance) is required. The other
/// hooks default to "drop the object", "do nothing" and "always valid".
///
/// # Examples
///
/// ```
/// use limiting_pool::{FactoryError, ObjectFactory};
///
/// struct Buffers;
///
/// impl ObjectFactory for Buffers {
///     type Object = Vec<u8>;
///
///     fn new_instance(&self) -> Result<Vec<u8>, FactoryError> {
///         Ok(Vec::with_capacity(4096))
///     }
///
///     fn recycle(&self, buffer: &mut Vec<u8>) {
///         buffer.clear();
///     }
/// }
///
/// let mut buffer = Buffers.new_instance().unwrap();
/// buffer.push(1);
/// Buffers.recycle(&mut buffer);
/// assert!(buffer.is_empty());
/// ```
pub trait ObjectFactory: Send + Sync + 'static {
    /// The type of object handed out by the pool
    type Object: Send + 'static;

    /// Create a new object. Errors propagate to the caller of `acquire`.
    fn new_instance(&self) -> Result<Self::Object, FactoryError>;

    /// Permanently destroy an object that leaves the pool.
    ///
    /// Errors are logged by the pool and otherwise ignored.
    fn decommission(&self, object: Self::Object) -> Result<(), FactoryError> {
        drop(object);
        Ok(())
    }

    /// Reset an object before it goes back into the pool
    fn recycle(&self, _object: &mut Self::Object) {}

    /// Check whether an idle object may be handed out again.
    ///
    /// Called only for reused objects, never for freshly created ones. An
    /// object that fails validation is decommissioned.
    fn validate(&self, _object: &mut Self::Object) -> bool {
        true
    }
}

/// Factory backed by a closure
///
/// # Examples
///
/// ```
/// use limiting_pool::{FnFactory, ObjectFactory};
///
/// let factory = FnFactory::new(|| String::with_capacity(64))
///     .with_recycle(|s: &mut String| s.clear());
///
/// let mut s = factory.new_instance().unwrap();
/// s.push_str("hello");
/// factory.recycle(&mut s);
/// assert!(s.is_empty());
/// ```
pub struct FnFactory<T, C> {
    create: C,
    recycle: Option<fn(&mut T)>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, C> FnFactory<T, C>
where
    C: Fn() -> T,
{
    /// Create a factory from an infallible constructor
    pub fn new(create: C) -> Self {
        Self {
            create,
            recycle: None,
            _phantom: PhantomData,
        }
    }

    /// Reset objects with `recycle` whenever they are returned
    pub fn with_recycle(mut self, recycle: fn(&mut T)) -> Self {
        self.recycle = Some(recycle);
        self
    }
}

impl<T, C> ObjectFactory for FnFactory<T, C>
where
    T: Send + 'static,
    C: Fn() -> T + Send + Sync + 'static,
{
    type Object = T;

    fn new_instance(&self) -> Result<T, FactoryError> {
        Ok((self.create)())
    }

    fn recycle(&self, object: &mut T) {
        if let Some(recycle) = self.recycle {
            recycle(object);
        }
    }
}

impl<T, C> fmt::Debug for FnFactory<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory")
            .field("recycles", &self.recycle.is_some())
            .finish()
    }
}
