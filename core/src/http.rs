//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The client
//! builds `HttpRequest` values and parses `HttpResponse` values without ever
//! touching the network; a `Transport` implementation (or the caller) runs the
//! actual round-trip. XML-RPC only ever POSTs, so there is no method field.

use crate::error::RpcError;

/// An HTTP POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes a request built by `OdooClient`.
///
/// Implementations must return non-2xx responses as `Ok` data; the client
/// turns them into `RpcError::HttpStatus` itself. Only failures that produce
/// no response at all map to `RpcError::Transport`.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RpcError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RpcError> {
        (**self).execute(request)
    }
}

/// Turn a raw response body into text.
///
/// The charset comes from the `Content-Type` header, else from the XML
/// declaration. UTF-8 and ISO-8859-1 are understood; anything else, or bytes
/// that do not match the charset, is `MalformedResponse`.
pub fn decode_body(bytes: Vec<u8>, content_type: Option<&str>) -> Result<String, RpcError> {
    let charset = content_type
        .and_then(header_charset)
        .or_else(|| declared_encoding(&bytes))
        .map(|c| c.to_ascii_lowercase());

    match charset.as_deref() {
        None | Some("utf-8" | "utf8" | "us-ascii" | "ascii") => String::from_utf8(bytes)
            .map_err(|e| RpcError::MalformedResponse(format!("response body is not UTF-8: {e}"))),
        Some("iso-8859-1" | "latin1" | "latin-1" | "l1") => {
            Ok(bytes.into_iter().map(char::from).collect())
        }
        Some(other) => Err(RpcError::MalformedResponse(format!(
            "unsupported response encoding {other}"
        ))),
    }
}

fn header_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// `encoding="..."` from a leading `<?xml ... ?>` declaration.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let decl = head.trim_start().strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>")?];
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|q| *q == '"' || *q == '\'')?;
    let rest = &rest[1..];
    Some(rest[..rest.find(quote)?].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            url: "http://localhost/xmlrpc/2/common".to_string(),
            headers: vec![("content-type".to_string(), "text/xml".to_string())],
            body: String::new(),
        };
        assert_eq!(req.header("Content-Type"), Some("text/xml"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn success_range() {
        let mut resp = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(resp.is_success());
        resp.status = 301;
        assert!(!resp.is_success());
    }

    #[test]
    fn utf8_body_passes_through() {
        let body = decode_body("<a>Jos\u{e9}</a>".as_bytes().to_vec(), Some("text/xml")).unwrap();
        assert_eq!(body, "<a>Jos\u{e9}</a>");
    }

    #[test]
    fn latin1_declaration_is_transcoded() {
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>Jos".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</a>");
        let body = decode_body(bytes, None).unwrap();
        assert!(body.ends_with("<a>Jos\u{e9}</a>"), "{body}");
    }

    #[test]
    fn header_charset_wins_over_declaration() {
        let bytes = vec![b'<', b'a', b'>', 0xF1, b'<', b'/', b'a', b'>'];
        let body = decode_body(bytes, Some("text/xml; charset=\"latin1\"")).unwrap();
        assert_eq!(body, "<a>\u{f1}</a>");
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let bytes = vec![b'<', b'a', b'>', 0xE9, b'<', b'/', b'a', b'>'];
        assert!(matches!(
            decode_body(bytes, Some("text/xml")),
            Err(RpcError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unknown_charset_is_malformed() {
        let bytes = b"<?xml version='1.0' encoding='Shift_JIS'?><a/>".to_vec();
        let err = decode_body(bytes, None).unwrap_err();
        assert!(err.to_string().contains("shift_jis"), "{err}");
    }
}
