//! URI reference classification and path-prefix normalization.
//!
//! Every reference the rewrite engine touches is first turned into a path
//! relative to the channel base. That path is what ends up inside the proxy
//! URL, so resolving it later is a plain `base + path` concatenation.

use crate::channels::ChannelDescriptor;
use tracing::debug;
use url::Url;

/// Extensions that mark a reference as a sub-playlist
pub const PLAYLIST_EXTENSIONS: &[&str] = &["m3u8", "m3u"];

/// Extensions that mark a reference as a media segment
pub const SEGMENT_EXTENSIONS: &[&str] = &["ts", "aac", "m4s", "mp4", "m4a"];

/// What an upstream reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Playlist,
    Segment,
}

/// Split a reference into its path and its `?query` / `#fragment` suffix.
pub fn split_suffix(reference: &str) -> (&str, &str) {
    match reference.find(['?', '#']) {
        Some(idx) => reference.split_at(idx),
        None => (reference, ""),
    }
}

/// Classify a reference by the extension of its last path segment.
///
/// Query strings and fragments are ignored, so `seg_001.ts?token=abc` is a
/// segment. Returns `None` for unknown or missing extensions.
pub fn classify_by_extension(reference: &str) -> Option<ReferenceKind> {
    let (path, _) = split_suffix(reference);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file.rsplit_once('.')?;

    if PLAYLIST_EXTENSIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(ext))
    {
        Some(ReferenceKind::Playlist)
    } else if SEGMENT_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        Some(ReferenceKind::Segment)
    } else {
        None
    }
}

/// Directory part of a base-relative path, including the trailing `/`.
///
/// `tudn.isml/hls/index.m3u8?x=1` → `tudn.isml/hls/`, `index.m3u8` → ``.
pub fn directory_of(path: &str) -> &str {
    let (path, _) = split_suffix(path);
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// Convert an upstream reference into a path relative to the channel base.
///
/// `document_dir` is the base-relative directory of the playlist the
/// reference was found in. Returns `None` when the reference cannot be
/// expressed under the channel base (other host, non-HTTP scheme, or a
/// `..` walk above the base); such references are left untouched.
pub fn to_base_relative(
    reference: &str,
    document_dir: &str,
    channel: &ChannelDescriptor,
) -> Option<String> {
    let (path, suffix) = split_suffix(reference);

    let joined = if let Some(rest) = strip_absolute_base(path, channel) {
        rest
    } else if has_scheme(path) || path.starts_with('/') {
        debug!("Reference outside channel base left untouched: {}", reference);
        return None;
    } else {
        format!("{}{}", document_dir, path)
    };

    let normalized = normalize_dot_segments(&joined)?;
    if normalized.is_empty() {
        return None;
    }

    Some(format!("{}{}", normalized, suffix))
}

/// Strip the channel base from absolute (`https://…`), scheme-relative
/// (`//host/…`) and host-absolute (`/…`) paths that live under it.
fn strip_absolute_base(path: &str, channel: &ChannelDescriptor) -> Option<String> {
    let base = Url::parse(&channel.base).ok()?;

    let absolute = if path.starts_with("//") {
        format!("{}:{}", base.scheme(), path)
    } else if path.starts_with('/') {
        return path.strip_prefix(base.path()).map(str::to_string);
    } else if has_scheme(path) {
        path.to_string()
    } else {
        return None;
    };

    if let Some(rest) = absolute.strip_prefix(channel.base.as_str()) {
        return Some(rest.to_string());
    }

    // Same location spelled differently (host case, default port)
    let parsed = Url::parse(&absolute).ok()?;
    if parsed.origin() != base.origin() {
        return None;
    }
    parsed
        .path()
        .strip_prefix(base.path())
        .map(str::to_string)
}

/// `true` for references starting with a URI scheme (`https:`, `skd:`, `data:`)
fn has_scheme(reference: &str) -> bool {
    let Some(colon) = reference.find(':') else {
        return false;
    };
    let scheme = &reference[..colon];

    !scheme.is_empty()
        && !scheme.contains('/')
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// `.` or `..` if `segment` is a dot segment, including the percent-encoded
/// spellings (`%2e`, `.%2E`) URL parsers treat the same way.
pub(crate) fn dot_segment(segment: &str) -> Option<&'static str> {
    match segment.to_ascii_lowercase().replace("%2e", ".").as_str() {
        "." => Some("."),
        ".." => Some(".."),
        _ => None,
    }
}

/// Resolve `.` and `..` segments. Returns `None` if `..` climbs above the root.
fn normalize_dot_segments(path: &str) -> Option<String> {
    if !path.split('/').any(|s| dot_segment(s).is_some()) {
        return Some(path.to_string());
    }

    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len() - 1;
    let mut out: Vec<&str> = Vec::with_capacity(segments.len());

    for (idx, segment) in segments.iter().enumerate() {
        let dot = dot_segment(segment);
        match dot {
            Some(".") => {}
            Some(_) => {
                out.pop()?;
            }
            None => out.push(segment),
        }
        // A trailing dot segment still names a directory
        if idx == last && dot.is_some() {
            out.push("");
        }
    }

    Some(out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelRegistry;

    fn tudn() -> ChannelDescriptor {
        ChannelRegistry::builtin().resolve("tudn").unwrap().clone()
    }

    fn root_channel() -> ChannelDescriptor {
        ChannelDescriptor {
            key: "root".to_string(),
            base: "https://cdn.example.com/".to_string(),
            prefix: String::new(),
            manifest: "master.m3u8".to_string(),
            origin: "https://example.com".to_string(),
            referer: "https://example.com".to_string(),
        }
    }

    #[test]
    fn classifies_playlists_and_segments() {
        assert_eq!(
            classify_by_extension("index_720p.m3u8"),
            Some(ReferenceKind::Playlist)
        );
        assert_eq!(
            classify_by_extension("a/b/INDEX.M3U8?x=1"),
            Some(ReferenceKind::Playlist)
        );
        for seg in ["s.ts", "s.aac", "s.m4s", "init.mp4", "a.m4a?t=1#f"] {
            assert_eq!(classify_by_extension(seg), Some(ReferenceKind::Segment), "{seg}");
        }
    }

    #[test]
    fn unknown_extensions_are_unclassified() {
        assert_eq!(classify_by_extension("subs.vtt"), None);
        assert_eq!(classify_by_extension("chunk?id=5"), None);
        assert_eq!(classify_by_extension("dir.ts/file"), None);
        // Extension only in the query does not count
        assert_eq!(classify_by_extension("play?f=x.m3u8"), None);
    }

    #[test]
    fn directory_of_paths() {
        assert_eq!(directory_of("tudn.isml/hls/index.m3u8"), "tudn.isml/hls/");
        assert_eq!(directory_of("index.m3u8?dir=a/b"), "");
        assert_eq!(directory_of("a/"), "a/");
    }

    #[test]
    fn base_rooted_reference_from_base_directory() {
        let rel = to_base_relative("tudn.isml/hls/index_720p.m3u8", "", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/hls/index_720p.m3u8"));
    }

    #[test]
    fn prefixed_reference_in_nested_document_is_document_relative() {
        let rel = to_base_relative("tudn.isml/hls/seg.ts", "tudn.isml/hls/v1/", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/hls/v1/tudn.isml/hls/seg.ts"));
    }

    #[test]
    fn encoded_dot_segments_are_normalized() {
        let rel = to_base_relative("%2e%2e/shared/seg.ts", "tudn.isml/hls/", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/shared/seg.ts"));

        let rel = to_base_relative("a/.%2E/%2E/seg.ts", "tudn.isml/hls/", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/hls/seg.ts"));

        assert_eq!(to_base_relative("%2e%2e/%2E%2E/%2e%2e/x.ts", "tudn.isml/hls/", &tudn()), None);
    }

    #[test]
    fn dot_segment_spellings() {
        assert_eq!(dot_segment("."), Some("."));
        assert_eq!(dot_segment("%2E"), Some("."));
        assert_eq!(dot_segment(".%2e"), Some(".."));
        assert_eq!(dot_segment("%2e%2E"), Some(".."));
        assert_eq!(dot_segment("..."), None);
        assert_eq!(dot_segment("%2e.ts"), None);
    }

    #[test]
    fn bare_filename_gets_document_directory() {
        let rel = to_base_relative("seg_001.ts?token=abc", "tudn.isml/hls/", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/hls/seg_001.ts?token=abc"));
    }

    #[test]
    fn nested_relative_reference() {
        let rel = to_base_relative("audio/eng/seg.aac", "tudn.isml/hls/", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/hls/audio/eng/seg.aac"));
    }

    #[test]
    fn parent_directory_reference_is_normalized() {
        let rel = to_base_relative("../shared/key.ts", "tudn.isml/hls/", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/shared/key.ts"));
    }

    #[test]
    fn escaping_the_base_is_rejected() {
        assert_eq!(to_base_relative("../../../x.ts", "tudn.isml/hls/", &tudn()), None);
    }

    #[test]
    fn absolute_url_under_base_is_stripped() {
        let rel = to_base_relative(
            "https://streaming-live-fcdn.api.prd.univisionnow.com/tudn/tudn.isml/hls/seg.ts?t=1",
            "tudn.isml/hls/",
            &tudn(),
        );
        assert_eq!(rel.as_deref(), Some("tudn.isml/hls/seg.ts?t=1"));
    }

    #[test]
    fn absolute_url_with_uppercase_host_is_stripped() {
        let rel = to_base_relative(
            "https://STREAMING-LIVE-FCDN.api.prd.univisionnow.com:443/tudn/x/seg.ts",
            "",
            &tudn(),
        );
        assert_eq!(rel.as_deref(), Some("x/seg.ts"));
    }

    #[test]
    fn host_absolute_path_under_base_is_stripped() {
        let rel = to_base_relative("/tudn/tudn.isml/hls/seg.ts", "tudn.isml/hls/", &tudn());
        assert_eq!(rel.as_deref(), Some("tudn.isml/hls/seg.ts"));
    }

    #[test]
    fn scheme_relative_under_base_is_stripped() {
        let rel = to_base_relative(
            "//streaming-live-fcdn.api.prd.univisionnow.com/tudn/a.ts",
            "",
            &tudn(),
        );
        assert_eq!(rel.as_deref(), Some("a.ts"));
    }

    #[test]
    fn foreign_references_are_left_alone() {
        let channel = tudn();
        assert_eq!(to_base_relative("https://other.example.com/seg.ts", "", &channel), None);
        assert_eq!(to_base_relative("/elsewhere/seg.ts", "", &channel), None);
        assert_eq!(to_base_relative("skd://key-id", "", &channel), None);
        assert_eq!(to_base_relative("data:text/plain,abc", "", &channel), None);
    }

    #[test]
    fn empty_prefix_joins_document_directory() {
        let channel = root_channel();
        let rel = to_base_relative("seg.ts", "v1/", &channel);
        assert_eq!(rel.as_deref(), Some("v1/seg.ts"));

        let rel = to_base_relative("v1/index.m3u8", "", &channel);
        assert_eq!(rel.as_deref(), Some("v1/index.m3u8"));
    }

    #[test]
    fn query_is_copied_verbatim() {
        let rel = to_base_relative("seg.ts?a=%2F..%2F&b=../c", "d/", &tudn());
        assert_eq!(rel.as_deref(), Some("d/seg.ts?a=%2F..%2F&b=../c"));
    }

    #[test]
    fn scheme_detection() {
        assert!(has_scheme("https://x"));
        assert!(has_scheme("skd://x"));
        assert!(!has_scheme("seg.ts"));
        assert!(!has_scheme("a/b:c.ts"));
        assert!(!has_scheme("1abc:x"));
    }
}
