//! # Resource factory
//!
//! The factory interns every loaded resource by the hash of its canonical
//! name, so equivalent names share a single typed instance. Two tables are
//! kept in bijection: `by_hash` maps name-hash to the descriptor, and
//! `by_address` maps the shared pointer's allocation address back to the
//! name-hash, giving O(1) lookup in both directions. `acquire` keys on the
//! name, `release` keys on the handle the caller holds.
//!
//! A factory is owned by one thread; callers serialize all operations.
//! Handlers must not call back into the factory.

use std::any::Any;
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use zip::ZipArchive;

use crate::errors::{Error, ReloadError, Result};
use crate::ins::StatusServer;
use crate::loader::{HttpTransport, Loader};
use crate::registry::{HandlerId, HandlerRegistry, ResourceHandler};
use crate::settings::{FactoryFlags, FactoryParams};
use crate::uri::Uri;
use crate::utils::{FastHashMap, NameHash};

/// Upper bound on canonical path lengths, the factory's base path
/// included.
pub const RESOURCE_PATH_MAX: usize = 1024;

const MAX_RELOAD_OBSERVERS: usize = 16;

/// The shared pointer to a typed resource object. The allocation address
/// is the caller-visible identity of the resource and stays stable across
/// reloads.
pub type ResourcePtr = Rc<RefCell<Box<dyn Any>>>;

/// Callback invoked after every successful reload, with the up-to-date
/// descriptor and the name the reloading caller passed.
pub type ReloadObserver = Box<dyn FnMut(&ResourceDescriptor, &str)>;

/// Identity of a registered reload observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u32);

/// Interned record of a loaded resource.
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub name_hash: NameHash,
    pub resource: ResourcePtr,
    pub handler: HandlerId,
    pub ref_count: u32,
}

pub struct Factory {
    uri: Uri,
    registry: HandlerRegistry,
    loader: Loader,

    by_hash: FastHashMap<NameHash, ResourceDescriptor>,
    by_address: FastHashMap<usize, NameHash>,

    // Only kept when reload support is enabled.
    hash_to_filename: Option<FastHashMap<NameHash, String>>,
    observers: Option<Vec<(ObserverId, ReloadObserver)>>,
    next_observer: u32,

    server: Option<StatusServer>,
}

impl Factory {
    /// Creates a factory rooted at `uri`, which must be of the form
    /// `scheme://host[:port]/path` with scheme `http` or `file`.
    pub fn new(params: FactoryParams, uri: &str) -> Result<Factory> {
        let uri = match Uri::new(uri) {
            Ok(uri) => uri,
            Err(err) => {
                error!("Unable to parse uri: {} ({})", uri, err);
                return Err(Error::Invalid);
            }
        };

        let http = match uri.scheme() {
            "http" => {
                let port = match uri.port() {
                    Some(port) => match port.parse::<u16>() {
                        Ok(port) => port,
                        Err(_) => {
                            error!("Invalid URI: {}", uri);
                            return Err(Error::Invalid);
                        }
                    },
                    None => 80,
                };

                Some(HttpTransport {
                    client: reqwest::blocking::Client::new(),
                    host: uri.host().to_owned(),
                    port,
                })
            }
            "file" => None,
            _ => {
                error!("Invalid URI: {}", uri);
                return Err(Error::Invalid);
            }
        };

        let archive = match params.builtins_archive {
            Some(blob) => match ZipArchive::new(Cursor::new(blob)) {
                Ok(archive) => Some(archive),
                Err(err) => {
                    error!("Unable to read builtins archive: {}", err);
                    return Err(Error::Invalid);
                }
            },
            None => None,
        };

        let mut flags = params.flags;
        if flags.contains(FactoryFlags::HTTP_SERVER) {
            // The introspection endpoint reloads through filenames.
            flags |= FactoryFlags::RELOAD_SUPPORT;
        }

        let server = if flags.contains(FactoryFlags::HTTP_SERVER) {
            match StatusServer::bind(params.http_server_port) {
                Ok(server) => Some(server),
                Err(err) => {
                    warn!(
                        "Unable to start http server on port: {} ({})",
                        params.http_server_port, err
                    );
                    None
                }
            }
        } else {
            None
        };

        let (hash_to_filename, observers) = if flags.contains(FactoryFlags::RELOAD_SUPPORT) {
            (
                Some(FastHashMap::with_capacity_and_hasher(
                    params.max_resources,
                    Default::default(),
                )),
                Some(Vec::with_capacity(MAX_RELOAD_OBSERVERS)),
            )
        } else {
            (None, None)
        };

        Ok(Factory {
            uri,
            registry: HandlerRegistry::new(),
            loader: Loader::new(params.stream_buffer_size, archive, http),
            by_hash: FastHashMap::with_capacity_and_hasher(
                params.max_resources,
                Default::default(),
            ),
            by_address: FastHashMap::with_capacity_and_hasher(
                params.max_resources,
                Default::default(),
            ),
            hash_to_filename,
            observers,
            next_observer: 0,
            server,
        })
    }

    /// Registers a handler for `extension` (spelled without the dot).
    /// The registry is append-only; at most 128 handlers are accepted.
    pub fn register<H>(&mut self, extension: &str, handler: H) -> Result<HandlerId>
    where
        H: ResourceHandler + 'static,
    {
        self.registry.register(extension, handler)
    }

    /// Resolves an extension to its handler identity.
    pub fn type_from_extension(&self, extension: &str) -> Result<HandlerId> {
        self.registry
            .find(extension)
            .ok_or_else(|| Error::UnknownResourceType(extension.to_owned()))
    }

    /// Resolves a handler identity back to its extension.
    pub fn extension_from_type(&self, id: HandlerId) -> Result<&str> {
        self.registry
            .extension(id)
            .ok_or_else(|| Error::UnknownResourceType(format!("{:?}", id)))
    }

    /// Resolves a live resource to its handler identity.
    pub fn type_of(&self, resource: &ResourcePtr) -> Result<HandlerId> {
        let hash = match self.by_address.get(&address(resource)) {
            Some(hash) => *hash,
            None => return Err(Error::NotLoaded),
        };

        let rd = &self.by_hash[&hash];
        assert!(rd.ref_count > 0);
        Ok(rd.handler)
    }

    /// Acquires the resource behind `name`, loading and creating it on
    /// first use and sharing the interned instance afterwards. Identity is
    /// the hash of the canonical name, never the spelling of `name`.
    pub fn acquire(&mut self, name: &str) -> Result<ResourcePtr> {
        let canonical = canonicalize(self.uri.path(), name);
        let hash = NameHash::of(&canonical);

        if let Some(rd) = self.by_hash.get_mut(&hash) {
            assert!(self.by_address.contains_key(&address(&rd.resource)));
            rd.ref_count += 1;
            return Ok(rd.resource.clone());
        }

        let extension = match name.rfind('.') {
            Some(dot) => &name[dot + 1..],
            None => {
                warn!(
                    "Unable to load resource: '{}'. Missing file extension.",
                    name
                );
                return Err(Error::MissingFileExtension(name.to_owned()));
            }
        };

        let handler = match self.registry.find(extension) {
            Some(handler) => handler,
            None => {
                error!("Unknown resource type: {}", extension);
                return Err(Error::UnknownResourceType(extension.to_owned()));
            }
        };

        self.loader.load(&canonical, name)?;

        let created = self
            .registry
            .handler_mut(handler)
            .create(self.loader.stream().contents(), name);

        match created {
            Ok(object) => {
                let resource: ResourcePtr = Rc::new(RefCell::new(object));

                let rd = ResourceDescriptor {
                    name_hash: hash,
                    resource: resource.clone(),
                    handler,
                    ref_count: 1,
                };

                self.by_address.insert(address(&resource), hash);
                self.by_hash.insert(hash, rd);
                if let Some(filenames) = self.hash_to_filename.as_mut() {
                    filenames.insert(hash, canonical);
                }

                Ok(resource)
            }
            Err(_) => {
                warn!("Unable to create resource: {}", canonical);
                Err(Error::Unknown)
            }
        }
    }

    /// Releases one reference to `resource`. When the count reaches zero
    /// the handler's `destroy` runs and the resource leaves all tables.
    ///
    /// Releasing a handle the factory never issued is a programmer error
    /// and asserts.
    pub fn release(&mut self, resource: &ResourcePtr) {
        let addr = address(resource);
        let hash = *self
            .by_address
            .get(&addr)
            .expect("released a resource unknown to the factory");

        let drained = {
            let rd = self
                .by_hash
                .get_mut(&hash)
                .expect("intern tables out of sync");
            assert!(rd.ref_count > 0);
            rd.ref_count -= 1;
            rd.ref_count == 0
        };

        if drained {
            // Destroy before erasing, so the handler can still read the
            // descriptor.
            let rd = self.by_hash[&hash].clone();
            self.registry.handler_mut(rd.handler).destroy(&rd);

            self.by_address.remove(&addr);
            self.by_hash.remove(&hash);
            if let Some(filenames) = self.hash_to_filename.as_mut() {
                filenames.remove(&hash);
            }
        }
    }

    /// Returns a snapshot of the interned descriptor behind `name`.
    /// Holding the snapshot's pointer does not count as an acquisition.
    pub fn descriptor_of(&self, name: &str) -> Result<ResourceDescriptor> {
        let canonical = canonicalize(self.uri.path(), name);
        let hash = NameHash::of(&canonical);

        self.by_hash.get(&hash).cloned().ok_or(Error::NotLoaded)
    }

    /// Reloads `name` in place. The typed object is recreated behind the
    /// existing shared pointer, so its identity is preserved and every
    /// outstanding handle observes the new content. Observers are notified
    /// in registration order after the handler succeeds.
    pub fn reload(&mut self, name: &str) -> ::std::result::Result<(), ReloadError> {
        let canonical = canonicalize(self.uri.path(), name);
        let hash = NameHash::of(&canonical);

        let (handler, resource) = match self.by_hash.get(&hash) {
            Some(rd) => (rd.handler, rd.resource.clone()),
            None => return Err(ReloadError::NotFound),
        };

        if !self.registry.handler(handler).reloadable() {
            let extension = self
                .registry
                .extension(handler)
                .unwrap_or_default()
                .to_owned();
            return Err(ReloadError::NotSupported { extension });
        }

        self.loader
            .load(&canonical, name)
            .map_err(ReloadError::Load)?;

        let recreated = {
            let mut object = resource.borrow_mut();
            self.registry.handler_mut(handler).recreate(
                self.loader.stream().contents(),
                name,
                &mut **object,
            )
        };

        match recreated {
            Ok(()) => {
                let Factory {
                    ref by_hash,
                    ref mut observers,
                    ..
                } = *self;

                if let Some(observers) = observers.as_mut() {
                    let rd = &by_hash[&hash];
                    for (_, observer) in observers.iter_mut() {
                        observer(rd, name);
                    }
                }

                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Registers a reload observer. Returns `None` when reload support is
    /// disabled, or when the bounded observer list is full (logged).
    pub fn register_reload_observer(&mut self, observer: ReloadObserver) -> Option<ObserverId> {
        let observers = self.observers.as_mut()?;

        if observers.len() == MAX_RELOAD_OBSERVERS {
            warn!(
                "Reload observer could not be registered since the maximum capacity of observers has been reached ({}).",
                MAX_RELOAD_OBSERVERS
            );
            return None;
        }

        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        observers.push((id, observer));
        Some(id)
    }

    pub fn unregister_reload_observer(&mut self, id: ObserverId) {
        if let Some(observers) = self.observers.as_mut() {
            let mut i = 0;
            while i < observers.len() {
                if observers[i].0 == id {
                    observers.swap_remove(i);
                } else {
                    i += 1;
                }
            }
        }
    }

    /// Pumps the introspection endpoint, serving whatever requests are
    /// ready. This is the only point where reload side-effects enter the
    /// factory from outside.
    pub fn update(&mut self) {
        if let Some(server) = self.server.take() {
            server.poll(self);
            self.server = Some(server);
        }
    }

    /// Number of interned resources.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub(crate) fn status_rows(&self) -> Vec<(String, u32)> {
        let mut rows = Vec::new();
        if let Some(filenames) = self.hash_to_filename.as_ref() {
            for (hash, filename) in filenames.iter() {
                let rd = self.by_hash.get(hash).expect("intern tables out of sync");
                rows.push((filename.clone(), rd.ref_count));
            }
        }
        rows
    }

    pub(crate) fn has_reload_support(&self) -> bool {
        self.hash_to_filename.is_some()
    }
}

#[inline]
fn address(resource: &ResourcePtr) -> usize {
    Rc::as_ptr(resource) as *const u8 as usize
}

/// Joins `base` and `rel` with `/` and collapses every run of `/` into
/// one. No `.`/`..` resolution and no filesystem access, so the same
/// spelling always maps to the same slot.
fn canonicalize(base: &str, rel: &str) -> String {
    assert!(base.len() + rel.len() + 1 <= RESOURCE_PATH_MAX);

    let mut path = String::with_capacity(base.len() + rel.len() + 1);
    let mut last = '\0';
    for c in base.chars().chain(Some('/')).chain(rel.chars()) {
        if c != '/' || last != '/' {
            path.push(c);
        }
        last = c;
    }

    path
}
