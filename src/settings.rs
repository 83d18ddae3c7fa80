//! Factory construction parameters.

use bitflags::bitflags;

bitflags! {
    /// Capability flags of a factory.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FactoryFlags: u32 {
        /// Keep canonical filenames around so resources can be reloaded.
        const RELOAD_SUPPORT = 1 << 0;
        /// Serve the introspection endpoint. Implies `RELOAD_SUPPORT`.
        const HTTP_SERVER = 1 << 1;
    }
}

impl Default for FactoryFlags {
    fn default() -> Self {
        FactoryFlags::empty()
    }
}

/// Configuration for `Factory::new`.
#[derive(Debug, Clone)]
pub struct FactoryParams {
    /// Capacity hint for the intern tables.
    pub max_resources: usize,
    /// Size of the shared load buffer. One extra byte is always reserved
    /// for the trailing NUL.
    pub stream_buffer_size: usize,
    pub flags: FactoryFlags,
    /// Port of the introspection endpoint, when `HTTP_SERVER` is set.
    pub http_server_port: u16,
    /// Optional zip blob consulted before any other transport.
    pub builtins_archive: Option<Vec<u8>>,
}

impl Default for FactoryParams {
    fn default() -> Self {
        FactoryParams {
            max_resources: 1024,
            stream_buffer_size: 4 * 1024 * 1024,
            flags: FactoryFlags::empty(),
            http_server_port: crate::ins::DEFAULT_PORT,
            builtins_archive: None,
        }
    }
}
