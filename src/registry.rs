//! # Handler registry
//!
//! Every resource extension is served by a `ResourceHandler`: a pluggable
//! triple of creation, destruction and optional in-place recreation. The
//! registry maps file extensions to handlers and hands out stable
//! `HandlerId`s, which serve as the opaque type identity of everything
//! created through a given entry.

use std::any::Any;

use crate::errors::{CreateError, Error, Result};
use crate::factory::ResourceDescriptor;

/// Maximum number of handlers a factory can carry.
pub const MAX_RESOURCE_TYPES: usize = 128;

/// The per-extension seam between the factory and typed resources.
///
/// `create` materializes a typed object from the raw bytes the transport
/// loader produced; the buffer is only valid for the duration of the call,
/// so implementations copy what they keep. `destroy` runs exactly once per
/// interned resource, when the final release drops the reference count to
/// zero.
///
/// Handlers that support live reload override `reloadable` and `recreate`.
/// `recreate` mutates the existing typed object through `&mut dyn Any`;
/// the object's allocation must stay in place so outstanding handles keep
/// observing it.
///
/// Handlers must not call back into the factory.
pub trait ResourceHandler {
    fn create(
        &mut self,
        bytes: &[u8],
        name: &str,
    ) -> ::std::result::Result<Box<dyn Any>, CreateError>;

    fn destroy(&mut self, descriptor: &ResourceDescriptor);

    fn reloadable(&self) -> bool {
        false
    }

    fn recreate(
        &mut self,
        bytes: &[u8],
        name: &str,
        resource: &mut dyn Any,
    ) -> ::std::result::Result<(), CreateError> {
        let _ = (bytes, name, resource);
        Err(CreateError::Unknown)
    }
}

/// Stable identity of a registered handler; an index into the append-only
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

struct HandlerEntry {
    extension: String,
    handler: Box<dyn ResourceHandler>,
}

/// Append-only extension table. Lookup is a linear scan; the table is
/// small and scanned rarely.
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry {
            entries: Vec::new(),
        }
    }

    pub fn register<H>(&mut self, extension: &str, handler: H) -> Result<HandlerId>
    where
        H: ResourceHandler + 'static,
    {
        if self.entries.len() == MAX_RESOURCE_TYPES {
            return Err(Error::OutOfResources);
        }

        // Dots not allowed in extensions.
        if extension.contains('.') {
            return Err(Error::Invalid);
        }

        if self.find(extension).is_some() {
            return Err(Error::AlreadyRegistered);
        }

        self.entries.push(HandlerEntry {
            extension: extension.to_owned(),
            handler: Box::new(handler),
        });

        Ok(HandlerId(self.entries.len() - 1))
    }

    pub fn find(&self, extension: &str) -> Option<HandlerId> {
        self.entries
            .iter()
            .position(|entry| entry.extension == extension)
            .map(HandlerId)
    }

    pub fn extension(&self, id: HandlerId) -> Option<&str> {
        self.entries.get(id.0).map(|entry| entry.extension.as_str())
    }

    pub(crate) fn handler(&self, id: HandlerId) -> &dyn ResourceHandler {
        self.entries[id.0].handler.as_ref()
    }

    pub(crate) fn handler_mut(&mut self, id: HandlerId) -> &mut dyn ResourceHandler {
        self.entries[id.0].handler.as_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
