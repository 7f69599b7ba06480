//! Content sniffing shared by every storage backend.
//!
//! Snapshots arrive as opaque bytes, so the stored object's extension and
//! content type are inferred from the leading magic bytes.

/// Maximum number of leading bytes inspected.
const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

enum Signature {
    /// Matches when the data starts with `pattern`.
    Exact(&'static [u8], &'static str),
    /// Matches when `data & mask == pattern` over the pattern's length.
    Masked(&'static [u8], &'static [u8], &'static str),
    /// Like `Exact`, after skipping leading whitespace.
    TrimmedExact(&'static [u8], &'static str),
    /// Case-insensitive tag after leading whitespace, terminated by a space or `>`.
    Html(&'static [u8]),
}

const SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::TrimmedExact(b"<?xml", "text/xml; charset=utf-8"),
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    Signature::Exact(b"\xFE\xFF", "text/plain; charset=utf-16be"),
    Signature::Exact(b"\xFF\xFE", "text/plain; charset=utf-16le"),
    Signature::Exact(b"\xEF\xBB\xBF", TEXT_PLAIN),
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Masked(
        b"RIFF\x00\x00\x00\x00WEBPVP",
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        "image/webp",
    ),
    Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    Signature::Masked(
        b"RIFF\x00\x00\x00\x00AVI ",
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        "video/avi",
    ),
    Signature::Masked(
        b"RIFF\x00\x00\x00\x00WAVE",
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        "audio/wave",
    ),
    Signature::Masked(
        b"FORM\x00\x00\x00\x00AIFF",
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        "audio/aiff",
    ),
    Signature::Exact(b"ID3", "audio/mpeg"),
    Signature::Exact(b"OggS\x00", "application/ogg"),
    Signature::Exact(b"MThd\x00\x00\x00\x06", "audio/midi"),
    Signature::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    Signature::Exact(b"\x00\x01\x00\x00", "font/ttf"),
    Signature::Exact(b"OTTO", "font/otf"),
    Signature::Exact(b"ttcf", "font/collection"),
    Signature::Exact(b"wOFF", "font/woff"),
    Signature::Exact(b"wOF2", "font/woff2"),
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Exact(b"\x00asm", "application/wasm"),
];

/// Extensions for the types `sniff` reports, taking precedence over the
/// (alphabetical) `mime_guess` listing.
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/bmp", "bmp"),
    ("image/x-icon", "ico"),
    ("application/pdf", "pdf"),
    ("application/postscript", "ps"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/xml", "xml"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/avi", "avi"),
    ("audio/wave", "wav"),
    ("audio/aiff", "aiff"),
    ("audio/mpeg", "mp3"),
    ("audio/midi", "mid"),
    ("application/ogg", "ogg"),
    ("font/ttf", "ttf"),
    ("font/otf", "otf"),
    ("font/collection", "ttc"),
    ("font/woff", "woff"),
    ("font/woff2", "woff2"),
    ("application/x-gzip", "gz"),
    ("application/zip", "zip"),
    ("application/x-rar-compressed", "rar"),
    ("application/wasm", "wasm"),
    ("application/octet-stream", "bin"),
];

impl Signature {
    fn matches(&self, data: &[u8]) -> Option<&'static str> {
        match self {
            Signature::Exact(pattern, mime) => data.starts_with(pattern).then_some(*mime),
            Signature::TrimmedExact(pattern, mime) => {
                trim_leading_whitespace(data).starts_with(pattern).then_some(*mime)
            }
            Signature::Masked(pattern, mask, mime) => {
                if data.len() < pattern.len() {
                    return None;
                }
                pattern
                    .iter()
                    .zip(mask.iter())
                    .zip(data)
                    .all(|((p, m), d)| d & m == *p)
                    .then_some(*mime)
            }
            Signature::Html(tag) => {
                let data = trim_leading_whitespace(data);
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let tag_matches = tag
                    .iter()
                    .zip(data)
                    .all(|(t, d)| t.eq_ignore_ascii_case(d));
                let terminated = matches!(data[tag.len()], b' ' | b'>');
                (tag_matches && terminated).then_some("text/html; charset=utf-8")
            }
        }
    }
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !is_whitespace(*b))
        .unwrap_or(data.len());
    &data[start..]
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

/// Sniffs the MIME type of `data`, falling back to plain text for
/// control-free content and `application/octet-stream` otherwise.
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    if let Some(mime) = SIGNATURES.iter().find_map(|sig| sig.matches(data)) {
        return mime;
    }
    if is_mp4(data) {
        return "video/mp4";
    }
    if data.iter().any(|b| is_binary(*b)) {
        return OCTET_STREAM;
    }
    TEXT_PLAIN
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size % 4 != 0 || data.len() < box_size || &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&i| i != 12)
        .any(|i| data.get(i..i + 3) == Some(&b"mp4"[..]))
}

/// The extension used for a MIME type. Sniffable types use their common
/// extension; for anything else the last one `mime_guess` lists wins.
pub fn extension_for(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    PREFERRED_EXTENSIONS
        .iter()
        .find(|(preferred, _)| preferred.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(essence).and_then(|exts| exts.last().copied())
        })
}

/// Appends the sniffed extension (if any) to `key`, returning the final key
/// together with the sniffed content type.
pub fn key_with_extension(key: String, data: &[u8]) -> (String, &'static str) {
    let mime = sniff(data);
    match extension_for(mime) {
        Some(ext) => (format!("{key}.{ext}"), mime),
        None => (key, mime),
    }
}
