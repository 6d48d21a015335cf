//! HLS manifest rewrite engine.
//!
//! Playlists are treated as line-oriented text rather than parsed into a
//! model and re-serialized: only URI references and the few attributes we
//! mutate change, every other byte goes out exactly as it came in.

pub mod attributes;
pub mod media;
pub mod reference;
pub mod rewrite;

pub use media::SubtitleMode;
pub use rewrite::{RewriteContext, rewrite_manifest};

/// Iterate over `(line, terminator)` pairs. The terminator is `"\r\n"`,
/// `"\n"` or `""` for a final line without newline.
pub(crate) fn split_lines(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split_inclusive('\n').map(|piece| {
        if let Some(line) = piece.strip_suffix("\r\n") {
            (line, "\r\n")
        } else if let Some(line) = piece.strip_suffix('\n') {
            (line, "\n")
        } else {
            (piece, "")
        }
    })
}
