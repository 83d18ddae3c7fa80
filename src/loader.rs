//! # Transport loader
//!
//! Fills the factory's shared stream buffer from one of three transports,
//! consulted in order: the builtins archive (looked up by the caller's
//! original name), the HTTP endpoint, and finally the local filesystem.
//! A miss in the archive falls through to the next transport.
//!
//! The buffer is reused across loads and always NUL-terminated after a
//! successful load, so text handlers may treat the content as a
//! NUL-terminated blob. Content is only valid until the next load.

use std::fs;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::errors::{Error, Result};

/// The single owned load buffer. Holds at most `limit + 1` bytes; the
/// extra byte is the guaranteed trailing NUL.
pub struct StreamBuffer {
    buf: Vec<u8>,
    len: usize,
    limit: usize,
}

impl StreamBuffer {
    fn new(limit: usize) -> Self {
        StreamBuffer {
            buf: Vec::with_capacity(limit + 1),
            len: 0,
            limit,
        }
    }

    fn begin(&mut self) {
        self.buf.clear();
        self.len = 0;
    }

    /// Appends a chunk, refusing instead of growing past the limit.
    fn push_chunk(&mut self, chunk: &[u8]) -> bool {
        if self.limit - self.buf.len() < chunk.len() {
            return false;
        }

        self.buf.extend_from_slice(chunk);
        self.len = self.buf.len();
        true
    }

    fn seal(&mut self) {
        self.len = self.buf.len();
        self.buf.push(0);
    }

    /// Loaded content, without the trailing NUL.
    #[inline]
    pub fn contents(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Loaded content including the trailing NUL.
    #[inline]
    pub fn with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

pub(crate) struct HttpTransport {
    pub client: reqwest::blocking::Client,
    pub host: String,
    pub port: u16,
}

/// State of the most recent HTTP load.
pub(crate) struct HttpState {
    pub content_length: u64,
    pub bytes_streamed: u64,
    pub status: i32,
    pub last_result: Option<Error>,
}

impl Default for HttpState {
    fn default() -> Self {
        HttpState {
            content_length: 0,
            bytes_streamed: 0,
            status: -1,
            last_result: None,
        }
    }
}

pub(crate) struct Loader {
    stream: StreamBuffer,
    archive: Option<ZipArchive<Cursor<Vec<u8>>>>,
    http: Option<HttpTransport>,
    http_state: HttpState,
}

impl Loader {
    pub fn new(
        stream_buffer_size: usize,
        archive: Option<ZipArchive<Cursor<Vec<u8>>>>,
        http: Option<HttpTransport>,
    ) -> Self {
        Loader {
            stream: StreamBuffer::new(stream_buffer_size),
            archive,
            http,
            http_state: HttpState::default(),
        }
    }

    pub fn stream(&self) -> &StreamBuffer {
        &self.stream
    }

    /// Loads `canonical` into the stream buffer and returns the content
    /// size. The archive is looked up by `original_name`, the way the
    /// caller spelled it.
    pub fn load(&mut self, canonical: &str, original_name: &str) -> Result<usize> {
        let Loader {
            ref mut stream,
            ref mut archive,
            ref http,
            ref mut http_state,
        } = *self;

        stream.begin();

        if let Some(archive) = archive.as_mut() {
            if let Ok(entry) = archive.by_name(original_name) {
                return load_archive_entry(stream, entry, canonical);
            }
            // Not in the archive. Fall through.
        }

        if let Some(http) = http.as_ref() {
            return load_http(stream, http_state, http, canonical);
        }

        load_file(stream, canonical)
    }
}

fn load_archive_entry(
    stream: &mut StreamBuffer,
    mut entry: zip::read::ZipFile,
    canonical: &str,
) -> Result<usize> {
    let size = entry.size() as usize;

    // Extra byte for resources expecting a NUL-terminated string.
    if size + 1 >= stream.limit {
        error!("Resource too large for stream buffer: {}", canonical);
        return Err(Error::StreamBufferTooSmall(canonical.to_owned()));
    }

    let read = entry
        .read_to_end(&mut stream.buf)
        .map_err(|_| Error::IoError)?;
    if read != size {
        return Err(Error::IoError);
    }

    stream.seal();
    Ok(size)
}

fn load_http(
    stream: &mut StreamBuffer,
    state: &mut HttpState,
    http: &HttpTransport,
    path: &str,
) -> Result<usize> {
    *state = HttpState::default();

    let url = format!("http://{}:{}{}", http.host, http.port, path);
    let mut response = match http.client.get(&url).send() {
        Ok(response) => response,
        Err(err) => {
            error!("Resource not found: {} ({})", path, err);
            return Err(Error::IoError);
        }
    };

    state.status = i32::from(response.status().as_u16());
    if let Some(length) = response.content_length() {
        state.content_length = length;
    }

    if !response.status().is_success() {
        error!("Resource not found: {}", path);

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::ResourceNotFound(path.to_owned()));
        }

        warn!("Unexpected http status code: {}", state.status);
        return Err(Error::IoError);
    }

    let mut chunk = [0u8; 16 * 1024];
    loop {
        let read = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) => {
                error!("Streaming of {} was interrupted ({})", path, err);
                return Err(Error::IoError);
            }
        };

        if !stream.push_chunk(&chunk[..read]) {
            state.last_result = Some(Error::StreamBufferTooSmall(path.to_owned()));
            break;
        }

        state.bytes_streamed += read as u64;
    }

    if let Some(err) = state.last_result.clone() {
        error!("Resource too large for stream buffer: {}", path);
        return Err(err);
    }

    if state.content_length != state.bytes_streamed {
        warn!(
            "Expected content length differs from actually streamed for resource {} ({} != {})",
            path, state.content_length, state.bytes_streamed
        );
    }

    stream.seal();
    Ok(state.bytes_streamed as usize)
}

fn load_file(stream: &mut StreamBuffer, path: &str) -> Result<usize> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(_) => {
            error!("Resource not found: {}", path);
            return Err(Error::ResourceNotFound(path.to_owned()));
        }
    };

    let size = file.metadata().map_err(|_| Error::IoError)?.len() as usize;

    // Extra byte for resources expecting a NUL-terminated string.
    if size + 1 >= stream.limit {
        error!("Resource too large for stream buffer: {}", path);
        return Err(Error::StreamBufferTooSmall(path.to_owned()));
    }

    let read = file
        .by_ref()
        .take(size as u64)
        .read_to_end(&mut stream.buf)
        .map_err(|_| Error::IoError)?;
    if read != size {
        return Err(Error::IoError);
    }

    stream.seal();
    Ok(size)
}
