//! # Foundry
//!
//! A reference-counted resource factory. Named binary assets are loaded
//! from one of several transports (in-memory archive, remote HTTP endpoint,
//! or local filesystem), materialized into typed in-memory objects by
//! pluggable per-extension handlers, and interned so that a canonical
//! resource name always maps to a single in-memory instance.
//!
//! Resources are shared through reference counting. Every `acquire` of the
//! same canonical name returns the same shared pointer and bumps the count;
//! the handler's `destroy` runs exactly once, when the final `release`
//! drops the count to zero.
//!
//! Loaded resources can be rebuilt in place with `reload`: the handler
//! recreates the typed object behind the existing shared pointer, so every
//! previously acquired handle observes the new content without changing
//! identity. Registered observers are notified after each successful
//! reload. An optional embedded HTTP endpoint exposes the interned set and
//! triggers reloads remotely.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub mod errors;
pub mod factory;
pub mod loader;
pub mod registry;
pub mod settings;
pub mod uri;
pub mod utils;

mod ins;

pub use crate::errors::{CreateError, Error, ReloadError, Result};
pub use crate::factory::{
    Factory, ObserverId, ReloadObserver, ResourceDescriptor, ResourcePtr, RESOURCE_PATH_MAX,
};
pub use crate::registry::{HandlerId, ResourceHandler, MAX_RESOURCE_TYPES};
pub use crate::settings::{FactoryFlags, FactoryParams};
