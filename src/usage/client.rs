use std::error::Error as StdError;
use std::io::{self, Read};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use super::types::UsageSnapshot;

pub const USER_AGENT: &str = "claude-code/2.0.31";
pub const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";
pub const ANTHROPIC_BETA_VALUE: &str = "oauth-2025-04-20";
pub const MAX_BODY_BYTES: u64 = 1 << 20;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to create usage request: {0}")]
    RequestBuildFailed(String),
    #[error("usage API timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("failed to call usage API: {0}")]
    NetworkFailed(String),
    #[error("usage API returned status {0}")]
    HttpStatus(u16),
    #[error("failed to decode usage response: {0}")]
    DecodeFailed(String),
}

/// Source of fresh usage snapshots.
pub trait UsageFetcher {
    fn fetch(&self, token: &str) -> Result<UsageSnapshot, FetchError>;
}

impl<T: UsageFetcher + ?Sized> UsageFetcher for &T {
    fn fetch(&self, token: &str) -> Result<UsageSnapshot, FetchError> {
        (**self).fetch(token)
    }
}

/// Blocking client for the OAuth usage endpoint.
pub struct HttpUsageClient {
    agent: ureq::Agent,
    endpoint: String,
    timeout: Duration,
}

impl HttpUsageClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    fn classify_transport(&self, err: &ureq::Transport) -> FetchError {
        match err.kind() {
            ureq::ErrorKind::InvalidUrl
            | ureq::ErrorKind::UnknownScheme
            | ureq::ErrorKind::BadHeader => FetchError::RequestBuildFailed(err.to_string()),
            _ if is_timeout(err) => FetchError::Timeout(self.timeout),
            _ => FetchError::NetworkFailed(err.to_string()),
        }
    }

    fn classify_read(&self, err: io::Error) -> FetchError {
        if matches!(
            err.kind(),
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
        ) {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::NetworkFailed(err.to_string())
        }
    }
}

impl UsageFetcher for HttpUsageClient {
    fn fetch(&self, token: &str) -> Result<UsageSnapshot, FetchError> {
        let result = self
            .agent
            .get(&self.endpoint)
            .set("Accept", "application/json")
            .set("Content-Type", "application/json")
            .set("User-Agent", USER_AGENT)
            .set("Authorization", &format!("Bearer {token}"))
            .set(ANTHROPIC_BETA_HEADER, ANTHROPIC_BETA_VALUE)
            .call();

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                discard_body(response);
                return Err(FetchError::HttpStatus(code));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(self.classify_transport(&transport));
            }
        };

        let status = response.status();
        if status != 200 {
            discard_body(response);
            return Err(FetchError::HttpStatus(status));
        }

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|err| self.classify_read(err))?;
        debug!(bytes = body.len(), "usage response received");

        serde_json::from_slice(&body).map_err(|err| FetchError::DecodeFailed(err.to_string()))
    }
}

// The body of an error response can carry account details; it is read and dropped.
fn discard_body(response: ureq::Response) {
    let _ = io::copy(
        &mut response.into_reader().take(MAX_BODY_BYTES),
        &mut io::sink(),
    );
}

fn is_timeout(err: &ureq::Transport) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            )
        {
            return true;
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serves exactly one canned response and reports the request head it saw.
    fn serve_once(status_line: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if line == "\r\n" {
                            break;
                        }
                        head.push_str(&line);
                    }
                }
            }
            let mut stream = reader.into_inner();
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
            let _ = tx.send(head);
        });
        (format!("http://{addr}/api/oauth/usage"), rx)
    }

    #[test]
    fn decodes_successful_response_and_sends_auth_headers() {
        let (url, seen) = serve_once(
            "200 OK",
            r#"{"five_hour":{"utilization":36.0,"resets_at":"2026-02-09T18:00:00+00:00"},"seven_day":{"utilization":82.0,"resets_at":null}}"#,
        );
        let client = HttpUsageClient::new(url, Duration::from_secs(5));

        let usage = client.fetch("test-token").expect("fetch");
        assert_eq!(usage.five_hour.expect("five hour").utilization, 36.0);
        assert_eq!(usage.seven_day.expect("seven day").utilization, 82.0);
        assert!(usage.seven_day_opus.is_none());

        let head = seen.recv().expect("request head").to_ascii_lowercase();
        assert!(head.starts_with("get /api/oauth/usage"));
        assert!(head.contains("authorization: bearer test-token"));
        assert!(head.contains("anthropic-beta: oauth-2025-04-20"));
        assert!(head.contains("user-agent: claude-code/2.0.31"));
        assert!(head.contains("accept: application/json"));
    }

    #[test]
    fn error_status_hides_response_body() {
        let (url, _seen) = serve_once(
            "429 Too Many Requests",
            r#"{"error":"rate_limited","account_email":"someone@example.com"}"#,
        );
        let client = HttpUsageClient::new(url, Duration::from_secs(5));

        let err = client.fetch("test-token").expect_err("429 must fail");
        assert!(matches!(err, FetchError::HttpStatus(429)));
        let text = err.to_string();
        assert_eq!(text, "usage API returned status 429");
        assert!(!text.contains("someone@example.com"));
    }

    #[test]
    fn malformed_body_is_decode_failure() {
        let (url, _seen) = serve_once("200 OK", "<html>maintenance</html>");
        let client = HttpUsageClient::new(url, Duration::from_secs(5));
        assert!(matches!(
            client.fetch("test-token"),
            Err(FetchError::DecodeFailed(_))
        ));
    }

    fn oversized_body() -> String {
        let padding = "x".repeat(2 * MAX_BODY_BYTES as usize);
        format!(r#"{{"five_hour":{{"utilization":1.0,"resets_at":null}},"padding":"{padding}"}}"#)
    }

    #[test]
    fn oversized_success_body_is_truncated_and_fails_to_decode() {
        let (url, _seen) = serve_once("200 OK", &oversized_body());
        let client = HttpUsageClient::new(url, Duration::from_secs(5));

        let err = client.fetch("test-token").expect_err("truncated body");
        assert!(
            matches!(err, FetchError::DecodeFailed(_)),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn oversized_error_body_still_reports_only_status() {
        let (url, _seen) = serve_once("503 Service Unavailable", &oversized_body());
        let client = HttpUsageClient::new(url, Duration::from_secs(5));

        let err = client.fetch("test-token").expect_err("503 must fail");
        assert!(matches!(err, FetchError::HttpStatus(503)));
        assert_eq!(err.to_string(), "usage API returned status 503");
    }

    #[test]
    fn unreachable_endpoint_is_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = HttpUsageClient::new(format!("http://{addr}/"), Duration::from_secs(2));
        assert!(matches!(
            client.fetch("test-token"),
            Err(FetchError::NetworkFailed(_) | FetchError::Timeout(_))
        ));
    }

    #[test]
    fn silent_server_hits_the_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let holder = thread::spawn(move || {
            let accepted = listener.accept();
            thread::sleep(Duration::from_millis(800));
            drop(accepted);
        });

        let client = HttpUsageClient::new(format!("http://{addr}/"), Duration::from_millis(200));
        let err = client.fetch("test-token").expect_err("must time out");
        assert!(
            matches!(err, FetchError::Timeout(timeout) if timeout == Duration::from_millis(200)),
            "unexpected error: {err}"
        );
        let _ = holder.join();
    }

    #[test]
    fn invalid_endpoint_fails_before_sending() {
        let client = HttpUsageClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(
            client.fetch("test-token"),
            Err(FetchError::RequestBuildFailed(_))
        ));
    }
}
