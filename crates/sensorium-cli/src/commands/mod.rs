pub mod fetch;
pub mod search;
pub mod serve;
pub mod simulate;

use std::net::TcpStream;
use std::time::Duration;

/// Connect to a running server with a receive timeout already applied.
pub(crate) fn connect(host: &str, port: u16) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect((host, port))?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    Ok(stream)
}
