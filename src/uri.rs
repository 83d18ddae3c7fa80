//! Uniqued resource location.
//!
//! Factory base locations are expressed as URIs. On creation, the URI is
//! parsed and indices to its parts are stored internally.

#[derive(Debug, Clone)]
pub struct Uri {
    uri: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
    port_start: usize,
    path_start: usize,
}

impl Uri {
    /// Parses `scheme://host[:port]/path`. Userinfo, query and fragment
    /// parts are not supported.
    pub fn new<T: Into<String>>(uri: T) -> Result<Self, failure::Error> {
        let uri = uri.into();

        let scheme_end = uri
            .find("://")
            .ok_or_else(|| format_err!("URI({}) must have a scheme!", uri))?;
        if scheme_end == 0 {
            bail!("URI({}) must have a scheme!", uri);
        }

        let host_start = scheme_end + 3;
        let authority = &uri[host_start..];
        let path_offset = authority
            .find('/')
            .ok_or_else(|| format_err!("URI({}) must have a hostname!", uri))?;
        let path_start = host_start + path_offset;

        let (host_end, port_start) = match authority[..path_offset].find(':') {
            Some(colon) => (host_start + colon, host_start + colon + 1),
            None => (path_start, path_start),
        };

        Ok(Uri {
            uri,
            scheme_end,
            host_start,
            host_end,
            port_start,
            path_start,
        })
    }

    #[inline]
    pub fn scheme(&self) -> &str {
        &self.uri[..self.scheme_end]
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.uri[self.host_start..self.host_end]
    }

    #[inline]
    pub fn port(&self) -> Option<&str> {
        if self.port_start < self.path_start {
            Some(&self.uri[self.port_start..self.path_start])
        } else {
            None
        }
    }

    /// The path part, always starting with `/`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.uri[self.path_start..]
    }
}

impl ::std::ops::Deref for Uri {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.uri
    }
}

impl ::std::fmt::Display for Uri {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}
