use bytes::{BufMut, Bytes, BytesMut};
use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

impl Method {
    fn parse(token: &str) -> Method {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            _ => Method::Other,
        }
    }
}

/// One parsed request, borrowing from the connection's read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: &'a str,
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    pub fn new(method: Method, target: &'a str, body: &'a [u8]) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Request { method, path, query, body }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Parsed<'a> {
    Complete(Request<'a>),
    /// Headers or body not fully received yet.
    Partial,
}

/// Parse one HTTP/1.x request from the start of `buf`.
///
/// The body is taken from `Content-Length`; chunked transfer encoding is
/// rejected. Bytes after the declared body are ignored.
pub fn parse_request(buf: &[u8]) -> Result<Parsed<'_>> {
    let Some(head_end) = find(buf, b"\r\n\r\n") else {
        return Ok(Parsed::Partial);
    };

    let head = std::str::from_utf8(&buf[..head_end]).map_err(|_| malformed("head is not UTF-8"))?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed("bad request line"));
    };
    if !version.starts_with("HTTP/1.") || !target.starts_with('/') {
        return Err(malformed("bad request line"));
    }

    let mut content_length = 0usize;
    for line in lines {
        let (name, value) = line.split_once(':').ok_or_else(|| malformed("bad header"))?;
        let name = name.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse().map_err(|_| malformed("bad content-length"))?;
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            return Err(malformed("transfer-encoding is not supported"));
        }
    }

    let body_start = head_end + 4;
    let Some(body_end) = body_start.checked_add(content_length) else {
        return Err(malformed("bad content-length"));
    };
    if buf.len() < body_end {
        return Ok(Parsed::Partial);
    }

    Ok(Parsed::Complete(Request::new(Method::parse(method), target, &buf[body_start..body_end])))
}

/// Bytes a complete request occupies according to its head, if the head has
/// arrived. Lets the reader reject oversized requests before the body lands.
pub fn declared_length(buf: &[u8]) -> Option<usize> {
    let head_end = find(buf, b"\r\n\r\n")?;
    let head = std::str::from_utf8(&buf[..head_end]).ok()?;
    let content_length = head
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    (head_end + 4).checked_add(content_length)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn malformed(what: &str) -> Error {
    Error::new(ErrorKind::InvalidInput, format!("Malformed request: {}", what))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    InternalError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::InternalError => "Internal Server Error",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Status::Ok => "application/json",
            _ => "text/plain",
        }
    }
}

/// Handler output: status plus body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub body: Bytes,
}

impl Reply {
    pub fn ok(body: Bytes) -> Self {
        Reply { status: Status::Ok, body }
    }

    pub fn error(status: Status) -> Self {
        Reply {
            status,
            body: Bytes::from_static(status.reason().as_bytes()),
        }
    }

    pub fn bad_request() -> Self {
        Reply::error(Status::BadRequest)
    }

    pub fn not_found() -> Self {
        Reply::error(Status::NotFound)
    }

    pub fn from_error(err: &Error) -> Self {
        match err.kind.status_code() {
            404 => Reply::not_found(),
            400 => Reply::bad_request(),
            _ => Reply::error(Status::InternalError),
        }
    }

    /// Literal HTTP/1.1 response. Every response closes the connection.
    pub fn render(&self) -> Bytes {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            self.status.content_type(),
            self.body.len(),
        );

        let mut out = BytesMut::with_capacity(head.len() + self.body.len());
        out.put_slice(head.as_bytes());
        out.put_slice(&self.body);
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_with_query() {
        let raw = b"GET /users/1/visits?country=Spain HTTP/1.1\r\nHost: x\r\n\r\n";
        let Parsed::Complete(request) = parse_request(raw).unwrap() else {
            panic!("expected a complete request");
        };
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/users/1/visits");
        assert_eq!(request.query, "country=Spain");
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_parse_waits_for_body() {
        let raw = b"POST /users/new HTTP/1.1\r\ncontent-length: 10\r\n\r\n{\"id\"";
        assert_eq!(parse_request(raw).unwrap(), Parsed::Partial);
        assert_eq!(declared_length(raw), Some(raw.len() - 5 + 10));

        assert_eq!(parse_request(b"GET /users/1 HTTP/1.1\r\n").unwrap(), Parsed::Partial);
        assert_eq!(declared_length(b"GET /users/1 HTTP/1.1\r\n"), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_request(b"GET\r\n\r\n").is_err());
        assert!(parse_request(b"GET users HTTP/1.1\r\n\r\n").is_err());
        assert!(parse_request(b"GET /users/1 SPDY/3\r\n\r\n").is_err());
        assert!(parse_request(b"POST /users/new HTTP/1.1\r\nContent-Length: ten\r\n\r\n").is_err());
        assert!(parse_request(b"POST /users/new HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n").is_err());
    }

    #[test]
    fn test_render_ok() {
        let rendered = Reply::ok(Bytes::from_static(b"{}")).render();
        assert_eq!(
            &rendered[..],
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\nContent-Length: 2\r\n\r\n{}"
        );
    }
}
