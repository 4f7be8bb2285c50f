//! HTTP transport for ask requests

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::{AskError, AskRequest, TransportReply};

/// Sends one request and returns whatever came back.
///
/// Implementations must not interpret the reply; see [`super::interpret`].
pub trait AskTransport: Send + Sync {
    fn send(&self, request: &AskRequest) -> Result<TransportReply, AskError>;
}

/// Blocking `reqwest` transport, used from the ask service's worker threads
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AskError> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| AskError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AskError::InvalidEndpoint(endpoint.to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("askpdf/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: url.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AskTransport for HttpTransport {
    fn send(&self, request: &AskRequest) -> Result<TransportReply, AskError> {
        log::debug!(
            "POST {} ({} chars of context)",
            self.endpoint,
            request.context.chars().count()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(request)
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(TransportReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    /// Accept one connection, return the request body, answer with `reply`
    fn one_shot_server(status_line: &'static str, reply: &'static str) -> (String, std::thread::JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
            }

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
                reply.len()
            )
            .unwrap();
            stream.flush().unwrap();

            (head, String::from_utf8(body).unwrap())
        });

        (format!("http://{addr}/api/ask"), handle)
    }

    #[test]
    fn posts_json_and_returns_reply() {
        let (endpoint, server) = one_shot_server("HTTP/1.1 200 OK", r#"{"answer":"42"}"#);
        let transport = HttpTransport::new(&endpoint, Duration::from_secs(5)).unwrap();

        let reply = transport
            .send(&AskRequest::new("context text", "why?"))
            .unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, r#"{"answer":"42"}"#);

        let (head, body) = server.join().unwrap();
        assert!(head.starts_with("POST /api/ask "));
        assert!(head.to_ascii_lowercase().contains("content-type: application/json"));
        let sent: AskRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(sent, AskRequest::new("context text", "why?"));
    }

    #[test]
    fn failure_status_is_returned_not_raised() {
        let (endpoint, server) =
            one_shot_server("HTTP/1.1 500 Internal Server Error", r#"{"error":"bad"}"#);
        let transport = HttpTransport::new(&endpoint, Duration::from_secs(5)).unwrap();

        let reply = transport.send(&AskRequest::new("a", "")).unwrap();
        assert_eq!(reply.status, 500);
        assert!(!reply.is_success());
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_an_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let transport =
            HttpTransport::new(&format!("http://{addr}/api/ask"), Duration::from_secs(2)).unwrap();
        assert!(transport.send(&AskRequest::new("a", "b")).is_err());
    }

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(matches!(
            HttpTransport::new("ftp://example.com/ask", Duration::from_secs(1)),
            Err(AskError::InvalidEndpoint(_))
        ));
        assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
    }
}
