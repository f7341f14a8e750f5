use super::types::ByteRange;

/// Extracts a quoted or bare `KEY=value` attribute from an `#EXT-*` tag
/// line. Attributes follow the tag's `:` or a subsequent `,`.
pub fn extract_attr_str(line: &str, key: &str) -> Option<String> {
    let key_eq = format!("{key}=");
    let pos = line
        .find(&format!(":{key_eq}"))
        .map(|p| p + 1)
        .or_else(|| line.find(&format!(",{key_eq}")).map(|p| p + 1))?;

    let rest = &line[pos + key_eq.len()..];

    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        Some(stripped[..end].to_string())
    } else {
        let end = rest.find(',').unwrap_or(rest.len());
        Some(rest[..end].trim().to_string())
    }
}

pub fn extract_attr_u64(line: &str, key: &str) -> Option<u64> {
    extract_attr_str(line, key)?.parse().ok()
}

/// Parses `WIDTHxHEIGHT` into `(width, height)`.
pub fn parse_resolution(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Parses a `#EXT-X-BYTERANGE` payload (`length[@offset]`), falling back to
/// `last_end_offset` (the previous segment's byte range end) when the
/// offset is omitted.
pub fn parse_byte_range(attr: &str, last_end_offset: u64) -> ByteRange {
    let attr = attr.trim().trim_matches('"');
    let mut parts = attr.split('@');
    let length = parts.next().unwrap_or("").trim().parse::<u64>().unwrap_or(0);
    let offset = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(last_end_offset);
    ByteRange { length, offset }
}

/// Resolves a possibly-relative playlist/segment URI against the playlist's
/// own URL. Query strings and fragments are stripped from the base before
/// resolution so auth tokens embedded there are not smeared into paths.
pub fn resolve_url(base: &str, maybe_relative: &str) -> String {
    if maybe_relative.starts_with("http://") || maybe_relative.starts_with("https://") {
        return maybe_relative.to_string();
    }

    let base_clean = base.split('?').next().unwrap_or(base);
    let base_clean = base_clean.split('#').next().unwrap_or(base_clean);

    if maybe_relative.starts_with('/') {
        if let Some(scheme_end) = base_clean.find("://") {
            let host_start = scheme_end + 3;
            let host_end = base_clean[host_start..]
                .find('/')
                .map(|p| host_start + p)
                .unwrap_or(base_clean.len());
            return format!("{}{}", &base_clean[..host_end], maybe_relative);
        }
    }

    let base_dir = base_clean
        .rfind('/')
        .map(|i| &base_clean[..=i])
        .unwrap_or(base_clean);
    format!("{base_dir}{maybe_relative}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_and_bare_attrs() {
        let line = r#"#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720,CODECS="avc1.4d401f""#;
        assert_eq!(extract_attr_u64(line, "BANDWIDTH"), Some(1_280_000));
        assert_eq!(extract_attr_str(line, "RESOLUTION").as_deref(), Some("1280x720"));
        assert_eq!(extract_attr_str(line, "CODECS").as_deref(), Some("avc1.4d401f"));
    }

    #[test]
    fn parses_resolution() {
        assert_eq!(parse_resolution("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_resolution("bogus"), None);
    }

    #[test]
    fn byte_range_defaults_offset_to_previous_end() {
        let r = parse_byte_range("1000", 5000);
        assert_eq!(r, ByteRange { length: 1000, offset: 5000 });
        let r2 = parse_byte_range("500@100", 5000);
        assert_eq!(r2, ByteRange { length: 500, offset: 100 });
    }

    #[test]
    fn resolves_relative_and_absolute_uris() {
        let base = "https://cdn.example.com/video/index.m3u8?token=abc";
        assert_eq!(resolve_url(base, "seg0.ts"), "https://cdn.example.com/video/seg0.ts");
        assert_eq!(resolve_url(base, "/other/seg0.ts"), "https://cdn.example.com/other/seg0.ts");
        assert_eq!(
            resolve_url(base, "https://other.example.com/x.ts"),
            "https://other.example.com/x.ts"
        );
    }
}
