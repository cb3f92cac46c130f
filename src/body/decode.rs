//! `Content-Encoding` decoders.

use std::io::{self, Read};

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};

/// A transport encoding the reader knows how to reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// No transformation.
    Identity,
    /// gzip, possibly multi-member.
    Gzip,
    /// zlib-wrapped deflate (raw deflate is accepted too).
    Deflate,
    /// Brotli.
    Brotli,
    /// Zstandard.
    Zstd,
}

impl ContentEncoding {
    /// Interpret a `Content-Encoding` header value.
    ///
    /// With several codings (`gzip, br`) the last one applied is the first
    /// one to undo; only that one is reversed. Returns `None` for codings
    /// this reader does not know.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let coding = value.rsplit(',').next().unwrap_or("").trim();
        match coding.to_ascii_lowercase().as_str() {
            "" | "identity" => Some(Self::Identity),
            "gzip" | "x-gzip" => Some(Self::Gzip),
            "deflate" => Some(Self::Deflate),
            "br" => Some(Self::Brotli),
            "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Decode `data`, producing at most `limit` bytes.
    ///
    /// Output beyond `limit` is an [`io::ErrorKind::InvalidData`] error, the
    /// same as a malformed stream.
    pub fn decode(self, data: &[u8], limit: u64) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(limit_hint(limit)));
        match self {
            Self::Identity => out.extend_from_slice(data),
            Self::Gzip => read_limited(MultiGzDecoder::new(data), limit, &mut out)?,
            Self::Deflate => {
                // Servers disagree on whether "deflate" carries a zlib header.
                if read_limited(ZlibDecoder::new(data), limit, &mut out).is_err() {
                    out.clear();
                    read_limited(DeflateDecoder::new(data), limit, &mut out)?;
                }
            }
            Self::Brotli => read_limited(brotli::Decompressor::new(data, 4096), limit, &mut out)?,
            Self::Zstd => read_limited(zstd::stream::read::Decoder::new(data)?, limit, &mut out)?,
        }
        Ok(out)
    }
}

fn limit_hint(limit: u64) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Drain `reader` into `out`, failing once more than `limit` bytes come out.
fn read_limited<R: Read>(reader: R, limit: u64, out: &mut Vec<u8>) -> io::Result<()> {
    reader.take(limit.saturating_add(1)).read_to_end(out)?;
    if out.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decoded body exceeds {} bytes", limit),
        ));
    }
    Ok(())
}
