//! HTTP response headers recovered from a header stream.
//!
//! The header stream holds serialized response info: a small binary prefix
//! followed by the raw header block, whose lines are separated by NUL bytes
//! and terminated by an empty line. Only that header block is parsed; the
//! binary prefix (timestamps, certificate data) is skipped.

/// Parsed response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    status_line: String,
    fields: Vec<(String, String)>,
}

impl HttpHeaders {
    /// Locate and parse the header block inside a header stream.
    ///
    /// Returns `None` if the stream contains no `HTTP/` status line.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let start = find(raw, b"HTTP/")?;
        let block = &raw[start..];
        let block = match find(block, b"\0\0") {
            Some(end) => &block[..end],
            None => block,
        };

        let mut lines = block.split(|&b| b == 0);
        let status_line = String::from_utf8_lossy(lines.next()?).trim().to_string();

        let fields = lines
            .filter_map(|line| {
                let line = String::from_utf8_lossy(line);
                let (name, value) = line.split_once(':')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect();

        Some(Self {
            status_line,
            fields,
        })
    }

    /// The status line, e.g. `HTTP/1.1 200 OK`.
    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// The numeric status code, if the status line has one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status_line.split_whitespace().nth(1)?.parse().ok()
    }

    /// First value of a header, matched case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All header fields in stored order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// The `Content-Encoding` value, if any.
    #[must_use]
    pub fn content_encoding(&self) -> Option<&str> {
        self.get("content-encoding")
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
