#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Binary,
}

/// Binary if and only if the bytes contain a NUL.
pub fn classify(bytes: &[u8]) -> ContentKind {
    if bytes.contains(&0) {
        ContentKind::Binary
    } else {
        ContentKind::Text
    }
}

/// Lossy UTF-8 decoding; invalid sequences become U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
