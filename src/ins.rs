//! Embedded introspection endpoint.
//!
//! A non-blocking TCP listener serving two routes: `GET /` renders the
//! interned resources as an HTML table, and `GET /reload/<name>` triggers
//! a reload of `name`, reporting the outcome through the log. The factory
//! pumps the listener from `update`.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use crate::errors::ReloadError;
use crate::factory::Factory;

pub const DEFAULT_PORT: u16 = 8001;

pub struct StatusServer {
    listener: TcpListener,
}

impl StatusServer {
    pub fn bind(port: u16) -> io::Result<StatusServer> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        listener.set_nonblocking(true)?;
        Ok(StatusServer { listener })
    }

    /// Serves every connection that is ready, then returns. Never blocks
    /// waiting for new clients.
    pub fn poll(&self, factory: &mut Factory) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(err) = serve(stream, factory) {
                        warn!("[StatusServer] Connection with {} broken! {}.", addr, err);
                    }
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!("[StatusServer] Failed to accept connection! {}", err);
                    break;
                }
            }
        }
    }
}

fn serve(mut stream: TcpStream, factory: &mut Factory) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_millis(500)))?;

    let target = match read_request_target(&mut stream)? {
        Some(target) => target,
        None => return respond(&mut stream, "400 Bad Request", ""),
    };

    if let Some(name) = target.strip_prefix("/reload/") {
        log_reload(factory.reload(name), name);
        respond(&mut stream, "200 OK", "")
    } else if target == "/" {
        if factory.has_reload_support() {
            respond(&mut stream, "200 OK", &status_page(factory))
        } else {
            respond(&mut stream, "200 OK", "")
        }
    } else {
        respond(&mut stream, "404 Not Found", "")
    }
}

/// Reads the request line and returns the target of a GET.
fn read_request_target(stream: &mut TcpStream) -> io::Result<Option<String>> {
    let mut line = String::new();
    BufReader::new(io::Read::by_ref(stream)).read_line(&mut line)?;

    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("GET"), Some(target)) => Ok(Some(target.to_owned())),
        _ => Ok(None),
    }
}

fn status_page(factory: &Factory) -> String {
    let mut body = String::from("<table>");
    body.push_str("<td><b>Filename</b></td><td><b>Reference count</b></td><tr/>");

    for (filename, ref_count) in factory.status_rows() {
        body.push_str(&format!("<td>{}<td>{}<tr/>", filename, ref_count));
    }

    body.push_str("</table>");
    body
}

fn log_reload(result: ::std::result::Result<(), ReloadError>, name: &str) {
    match result {
        Ok(()) => info!("{} was successfully reloaded.", name),
        Err(ReloadError::OutOfMemory) => error!("Not enough memory to reload {}.", name),
        Err(ReloadError::FormatError) | Err(ReloadError::ConstantError) => {
            error!("{} has invalid format and could not be reloaded.", name)
        }
        Err(ReloadError::NotFound) => {
            error!("{} could not be reloaded since it was never loaded before.", name)
        }
        Err(ReloadError::Load(_)) => error!("{} could not be loaded, reloading failed.", name),
        Err(ReloadError::NotSupported { extension }) => {
            warn!("Reloading of resource type {} not supported.", extension)
        }
        Err(ReloadError::Unknown) => warn!("{} could not be reloaded, unknown error.", name),
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )?;
    stream.flush()
}
