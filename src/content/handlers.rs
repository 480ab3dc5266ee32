use std::io::Read;

use crate::content::{Connection, Content, ContentHandler};
use crate::errors::{ErrorKind, NetError, Result};

fn read_all(conn: &mut dyn Connection) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    conn.input()?.read_to_end(&mut body)?;
    Ok(body)
}

/// Extracts the `charset` parameter of a content type, if any.
pub fn charset(content_type: &str) -> Option<&str> {
    let idx = content_type.to_ascii_lowercase().find("charset=")?;
    let after = &content_type[idx + "charset=".len()..];
    // charset value may be quoted or end at ; or end of string
    let end = after.find([';', ' ', '\t']).unwrap_or(after.len());
    Some(after[..end].trim_matches('"'))
}

/// Best-effort body decoder:
/// - honors `Content-Type: ...; charset=...` for UTF-8 and Latin-1
/// - falls back to lossy UTF-8
pub fn decode_text(content_type: Option<&str>, body: &[u8]) -> String {
    match content_type.and_then(charset) {
        Some(cs)
            if cs.eq_ignore_ascii_case("iso-8859-1")
                || cs.eq_ignore_ascii_case("latin1")
                || cs.eq_ignore_ascii_case("us-ascii") =>
        {
            body.iter().map(|&b| b as char).collect()
        }
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Decodes the payload into a `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextContentHandler;

impl ContentHandler for TextContentHandler {
    fn content(&self, conn: &mut dyn Connection) -> Result<Content> {
        let body = read_all(conn)?;
        Ok(Box::new(decode_text(conn.content_type(), &body)))
    }
}

/// Decodes the payload into a `serde_json::Value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentHandler;

impl ContentHandler for JsonContentHandler {
    fn content(&self, conn: &mut dyn Connection) -> Result<Content> {
        let body = read_all(conn)?;
        let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            NetError::with_message(ErrorKind::Protocol, format!("invalid json from {}", conn.url()))
                .with_source(e)
        })?;
        Ok(Box::new(value))
    }
}

/// Hands the payload over as raw `Vec<u8>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesContentHandler;

impl ContentHandler for BytesContentHandler {
    fn content(&self, conn: &mut dyn Connection) -> Result<Content> {
        Ok(Box::new(read_all(conn)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{content_of, BufferedConnection};
    use crate::headers::Headers;
    use url::Url;

    fn conn(content_type: &str, body: &[u8]) -> BufferedConnection {
        let mut headers = Headers::with_status_line("HTTP/1.1 200 OK");
        headers.append("Content-Type", content_type);
        BufferedConnection::new(
            Url::parse("http://example.com/doc").unwrap(),
            headers,
            body.to_vec(),
        )
    }

    #[test]
    fn charset_parsing() {
        assert_eq!(charset("text/html; charset=UTF-8"), Some("UTF-8"));
        assert_eq!(charset("text/html; Charset=\"latin1\"; q=1"), Some("latin1"));
        assert_eq!(charset("text/html"), None);
    }

    #[test]
    fn decode_respects_utf8_charset() {
        let s = decode_text(Some("text/html; charset=UTF-8"), b"<html>\xe2\x98\x83</html>");
        assert_eq!(s, "<html>\u{2603}</html>");
    }

    #[test]
    fn decode_latin1() {
        assert_eq!(decode_text(Some("text/plain; charset=ISO-8859-1"), b"caf\xe9"), "caf\u{e9}");
    }

    #[test]
    fn decode_falls_back_to_utf8_lossy_without_charset() {
        let s = decode_text(None, b"\xff\xfehello");
        assert!(s.contains("hello"));
    }

    #[test]
    fn text_handler_yields_string() {
        let mut c = conn("text/plain; charset=utf-8", b"hello");
        let text: Option<String> = content_of(&TextContentHandler, &mut c).unwrap();
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn json_handler_yields_value() {
        let mut c = conn("application/json", br#"{"a":[1,2]}"#);
        let value: serde_json::Value = content_of(&JsonContentHandler, &mut c).unwrap().unwrap();
        assert_eq!(value["a"][1], 2);
    }

    #[test]
    fn invalid_json_is_protocol_error() {
        let mut c = conn("application/json", b"{nope");
        let err = JsonContentHandler.content(&mut c).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn bytes_handler_passes_payload_through() {
        let mut c = conn("application/octet-stream", &[0, 1, 2, 255]);
        let bytes: Vec<u8> = content_of(&BytesContentHandler, &mut c).unwrap().unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 255]);
    }
}
