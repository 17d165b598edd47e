//! Image format detection from magic bytes.

/// Identify the image format of `bytes` from its header.
///
/// Returns a format identifier accepted by `ImageInput::from_bytes`, or
/// `None` when the header matches no supported format.
pub fn sniff_format(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }

    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpeg");
    }

    // PNG: 89 50 4E 47
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some("png");
    }

    // GIF: GIF8
    if bytes.starts_with(b"GIF8") {
        return Some("gif");
    }

    // WebP: RIFF....WEBP
    if bytes.starts_with(b"RIFF") && bytes.len() >= 12 && &bytes[8..12] == b"WEBP" {
        return Some("webp");
    }

    // BMP: BM
    if bytes.starts_with(b"BM") {
        return Some("bmp");
    }

    // TIFF: II (little-endian) or MM (big-endian) followed by version 42
    if bytes.starts_with(&[b'I', b'I', 0x2A, 0x00]) || bytes.starts_with(&[b'M', b'M', 0x00, 0x2A]) {
        return Some("tiff");
    }

    None
}

/// Format to report for bytes sent unmodified; unknown headers are sent as JPEG.
pub fn sniff_format_or_jpeg(bytes: &[u8]) -> &'static str {
    sniff_format(bytes).unwrap_or("jpeg")
}
