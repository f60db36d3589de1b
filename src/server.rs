use crate::error::{Error, Result};
use crate::query::parse_query;

use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

/// Body sent back to the browser once the provider redirected to us.
pub const CONFIRMATION_BODY: &str =
    "Authentication completed successfully. You may close this window.";

const READ_TIMEOUT: Duration = Duration::from_secs(10);
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Query parameters delivered by the provider's redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    /// The authorization code.
    pub code: String,
    /// The `state` value echoed back by the provider, if any.
    pub state: Option<String>,
}

/// Loopback HTTP listener catching the redirect on the configured path.
///
/// The listener runs on its own thread until a request carrying a `code` arrives, or until
/// [`stop`](CallbackServer::stop) is called. Dropping the server stops it as well.
pub struct CallbackServer {
    addr: SocketAddr,
    receiver: mpsc::Receiver<Callback>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Binds `127.0.0.1:<port>` and starts serving `path`. Port 0 picks a free port.
    pub fn bind(port: u16, path: &str) -> Result<Self> {
        Self::bind_on(SocketAddr::from((Ipv4Addr::LOCALHOST, port)), path)
    }

    /// Binds `addr` and starts serving `path`.
    ///
    /// Every accepted connection is answered on its own thread, so a client that connects and
    /// stays silent does not hold up the redirect.
    pub fn bind_on(addr: SocketAddr, path: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        tracing::info!(%addr, path, "callback listener bound");

        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let path: Arc<str> = Arc::from(path);
        let flag = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || {
            for stream in listener.incoming() {
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                match stream {
                    Ok(stream) => {
                        let tx = tx.clone();
                        let path = Arc::clone(&path);
                        let flag = Arc::clone(&flag);
                        std::thread::spawn(move || match handle_connection(stream, &path) {
                            Ok(Some(callback)) => {
                                if !flag.swap(true, Ordering::SeqCst) {
                                    let _ = tx.send(callback);
                                    // lets the accept loop observe the flag
                                    let _ = TcpStream::connect_timeout(&addr, WAKE_TIMEOUT);
                                }
                            }
                            Ok(None) => {}
                            Err(e) => tracing::warn!("failed to answer callback request: {}", e),
                        });
                    }
                    Err(e) => tracing::warn!("failed to accept connection: {}", e),
                }
            }
            tracing::debug!("callback listener closed");
        });

        Ok(CallbackServer {
            addr,
            receiver: rx,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Blocks until the redirect delivered a code, or until `timeout` elapses.
    pub fn wait_for_code(&self, timeout: Option<Duration>) -> Result<Callback> {
        match timeout {
            Some(timeout) => self.receiver.recv_timeout(timeout).map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => Error::CallbackTimeout,
                mpsc::RecvTimeoutError::Disconnected => Error::ListenerClosed,
            }),
            None => self.receiver.recv().map_err(|_| Error::ListenerClosed),
        }
    }

    /// Stops accepting connections and releases the port.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return,
        };
        self.shutdown.store(true, Ordering::SeqCst);
        // wakes up a blocking accept; refused once the thread already returned
        let _ = TcpStream::connect_timeout(&self.addr, WAKE_TIMEOUT);
        let _ = handle.join();
        tracing::debug!(addr = %self.addr, "callback listener stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Answers one connection. Returns the callback when the request hit `path` with a code.
fn handle_connection(mut stream: TcpStream, path: &str) -> Result<Option<Callback>> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // drain the headers so the client sees a clean close
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 || header.trim_end().is_empty() {
            break;
        }
    }

    let target = request_line.split_ascii_whitespace().nth(1).unwrap_or("/");
    let (request_path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };

    if request_path != path {
        tracing::debug!(
            request_target = target,
            "ignoring request outside the callback path"
        );
        write_response(&mut stream, "404 Not Found", "Not Found")?;
        return Ok(None);
    }

    let mut params = parse_query(query);
    write_response(&mut stream, "200 OK", CONFIRMATION_BODY)?;

    match params.remove("code").filter(|code| !code.is_empty()) {
        Some(code) => {
            tracing::info!("authorization code received");
            Ok(Some(Callback {
                code,
                state: params.remove("state"),
            }))
        }
        None => {
            tracing::warn!(
                error = params.get("error").map(String::as_str),
                "redirect without an authorization code, still waiting"
            );
            Ok(None)
        }
    }
}

fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> Result<()> {
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )?;
    stream.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::Ipv6Addr;
    use std::time::Instant;

    fn get(addr: SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn captures_code_and_state() {
        let server = CallbackServer::bind(0, "/cb").unwrap();
        let response = get(server.local_addr(), "/cb?code=XYZ&state=s1");
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with(CONFIRMATION_BODY));

        let callback = server.wait_for_code(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(
            callback,
            Callback {
                code: "XYZ".to_string(),
                state: Some("s1".to_string()),
            }
        );
        server.stop();
    }

    #[test]
    fn code_is_url_decoded() {
        let server = CallbackServer::bind(0, "/cb").unwrap();
        get(server.local_addr(), "/cb?code=a%2Fb%2Bc");
        let callback = server.wait_for_code(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(callback.code, "a/b+c");
        assert_eq!(callback.state, None);
    }

    #[test]
    fn missing_code_keeps_listening() {
        let server = CallbackServer::bind(0, "/cb").unwrap();
        let response = get(server.local_addr(), "/cb?error=access_denied");
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(matches!(
            server.wait_for_code(Some(Duration::from_millis(200))),
            Err(Error::CallbackTimeout)
        ));

        get(server.local_addr(), "/cb?code=late");
        let callback = server.wait_for_code(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(callback.code, "late");
    }

    #[test]
    fn silent_connection_does_not_delay_the_redirect() {
        let server = CallbackServer::bind(0, "/cb").unwrap();
        let _idle = TcpStream::connect(server.local_addr()).unwrap();

        let started = Instant::now();
        let response = get(server.local_addr(), "/cb?code=XYZ");
        assert!(response.starts_with("HTTP/1.1 200 OK"));

        let callback = server.wait_for_code(Some(Duration::from_secs(2))).unwrap();
        assert_eq!(callback.code, "XYZ");
        assert!(started.elapsed() < READ_TIMEOUT);
        server.stop();
    }

    #[test]
    fn only_the_first_code_is_delivered() {
        let server = CallbackServer::bind(0, "/cb").unwrap();
        get(server.local_addr(), "/cb?code=first");
        let callback = server.wait_for_code(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(callback.code, "first");

        // the accept loop winds down once a code went out
        let _ = TcpStream::connect(server.local_addr()).map(|mut stream| {
            let _ = write!(stream, "GET /cb?code=second HTTP/1.1\r\n\r\n");
        });
        assert!(server.wait_for_code(Some(Duration::from_millis(300))).is_err());
    }

    #[test]
    fn binds_ipv6_loopback() {
        let addr = SocketAddr::from((Ipv6Addr::LOCALHOST, 0));
        let server = match CallbackServer::bind_on(addr, "/cb") {
            Ok(server) => server,
            // host without IPv6 support
            Err(Error::IO(_)) => return,
            Err(e) => panic!("unexpected error: {}", e),
        };
        assert!(server.local_addr().is_ipv6());
        get(server.local_addr(), "/cb?code=v6");
        let callback = server.wait_for_code(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(callback.code, "v6");
    }

    #[test]
    fn other_paths_get_not_found() {
        let server = CallbackServer::bind(0, "/cb").unwrap();
        let response = get(server.local_addr(), "/favicon.ico");
        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
        assert!(matches!(
            server.wait_for_code(Some(Duration::from_millis(200))),
            Err(Error::CallbackTimeout)
        ));
    }

    #[test]
    fn stop_releases_the_port() {
        let server = CallbackServer::bind(0, "/cb").unwrap();
        let addr = server.local_addr();
        server.stop();
        TcpListener::bind(addr).unwrap();
    }

    #[test]
    fn drop_releases_the_port_while_waiting() {
        let addr = {
            let server = CallbackServer::bind(0, "/cb").unwrap();
            server.local_addr()
        };
        TcpListener::bind(addr).unwrap();
    }
}
