//! Ordered rewrite pipeline.
//!
//! 1. sub-playlist references → `/variant/<channel>/<path>`
//! 2. media segment references → `/segment/<channel>/<path>`
//! 3. optional subtitle default-track mutation
//!
//! Each stage takes the previous stage's text and returns new text. Lines
//! already in proxy form are skipped, so no stage re-matches an earlier
//! stage's output and running the pipeline twice changes nothing.

use super::media::{SubtitleMode, apply_subtitle_mode};
use super::reference::{ReferenceKind, classify_by_extension, directory_of, to_base_relative};
use super::{attributes::find_uri_value, split_lines};
use crate::channels::ChannelDescriptor;
use crate::route::{Tier, proxy_path};
use tracing::debug;

/// Where the playlist being rewritten lives, relative to its channel.
#[derive(Debug, Clone)]
pub struct RewriteContext<'a> {
    channel: &'a ChannelDescriptor,
    document_dir: String,
    /// Master playlists may name variants by their full base-relative path
    master: bool,
}

impl<'a> RewriteContext<'a> {
    /// Context for the channel's master playlist
    pub fn for_master(channel: &'a ChannelDescriptor) -> Self {
        let document_dir = directory_of(&channel.master_path()).to_string();
        Self {
            channel,
            document_dir,
            master: true,
        }
    }

    /// Context for a playlist fetched from `base + relative_path`
    pub fn for_document(channel: &'a ChannelDescriptor, relative_path: &str) -> Self {
        Self {
            channel,
            document_dir: directory_of(relative_path).to_string(),
            master: false,
        }
    }

    fn tier_for(kind: ReferenceKind) -> Tier {
        match kind {
            ReferenceKind::Playlist => Tier::Variant,
            ReferenceKind::Segment => Tier::Segment,
        }
    }

    /// Proxy path for `reference`, or `None` if it must stay as it is.
    fn rewrite_reference(&self, reference: &str, kind: ReferenceKind) -> Option<String> {
        if self.is_proxy_path(reference) {
            return None;
        }
        let relative = to_base_relative(reference, self.resolve_from(reference), self.channel)?;
        Some(proxy_path(Self::tier_for(kind), &self.channel.key, &relative))
    }

    /// Directory a relative reference is resolved against. In the master,
    /// a reference that already starts with the channel prefix is taken as
    /// relative to the base.
    fn resolve_from(&self, reference: &str) -> &str {
        let prefix = self.channel.prefix.as_str();
        if self.master && !prefix.is_empty() && reference.starts_with(prefix) {
            ""
        } else {
            &self.document_dir
        }
    }

    fn is_proxy_path(&self, reference: &str) -> bool {
        [Tier::Variant, Tier::Segment].iter().any(|tier| {
            reference
                .strip_prefix('/')
                .and_then(|r| r.strip_prefix(tier.as_str()))
                .and_then(|r| r.strip_prefix('/'))
                .and_then(|r| r.strip_prefix(self.channel.key.as_str()))
                .is_some_and(|r| r.starts_with('/'))
        })
    }
}

/// Run the whole pipeline over a raw playlist.
pub fn rewrite_manifest(raw: &str, ctx: &RewriteContext<'_>, mode: SubtitleMode) -> String {
    let text = rewrite_playlist_references(raw, ctx);
    let text = rewrite_segment_references(&text, ctx);
    apply_subtitle_mode(&text, mode)
}

/// Stage 1: route sub-playlist references through the variant tier.
pub fn rewrite_playlist_references(raw: &str, ctx: &RewriteContext<'_>) -> String {
    rewrite_references(raw, ctx, ReferenceKind::Playlist)
}

/// Stage 2: route media segment references through the segment tier.
pub fn rewrite_segment_references(raw: &str, ctx: &RewriteContext<'_>) -> String {
    rewrite_references(raw, ctx, ReferenceKind::Segment)
}

/// Kind of the quoted `URI` attribute carried by a tag, if we route it.
fn tag_uri_kind(tag_line: &str) -> Option<ReferenceKind> {
    let name = tag_line.split(':').next().unwrap_or(tag_line);
    match name {
        "#EXT-X-MEDIA" | "#EXT-X-I-FRAME-STREAM-INF" | "#EXT-X-RENDITION-REPORT" => {
            Some(ReferenceKind::Playlist)
        }
        "#EXT-X-MAP" | "#EXT-X-PART" | "#EXT-X-PRELOAD-HINT" | "#EXT-X-KEY"
        | "#EXT-X-SESSION-KEY" => Some(ReferenceKind::Segment),
        _ => None,
    }
}

fn rewrite_references(raw: &str, ctx: &RewriteContext<'_>, kind: ReferenceKind) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 4);
    // The URI line after EXT-X-STREAM-INF is a playlist whatever its name
    let mut after_stream_inf = false;

    for (line, eol) in split_lines(raw) {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            out.push_str(line);
        } else if trimmed.starts_with('#') {
            if trimmed.starts_with("#EXT-X-STREAM-INF") {
                after_stream_inf = true;
            }
            out.push_str(&rewrite_tag_uri(line, ctx, kind));
        } else {
            let line_kind = classify_by_extension(trimmed).unwrap_or(if after_stream_inf {
                ReferenceKind::Playlist
            } else {
                ReferenceKind::Segment
            });
            after_stream_inf = false;

            match (line_kind == kind)
                .then(|| ctx.rewrite_reference(trimmed, kind))
                .flatten()
            {
                Some(rewritten) => {
                    let start = line.len() - line.trim_start().len();
                    let end = start + trimmed.len();
                    out.push_str(&line[..start]);
                    out.push_str(&rewritten);
                    out.push_str(&line[end..]);
                }
                None => out.push_str(line),
            }
        }

        out.push_str(eol);
    }

    out
}

fn rewrite_tag_uri(line: &str, ctx: &RewriteContext<'_>, kind: ReferenceKind) -> String {
    if tag_uri_kind(line.trim_start()) != Some(kind) {
        return line.to_string();
    }
    let Some((start, end)) = find_uri_value(line) else {
        return line.to_string();
    };

    match ctx.rewrite_reference(&line[start..end], kind) {
        Some(rewritten) => {
            debug!("Rewrote tag URI {} -> {}", &line[start..end], rewritten);
            let mut result = String::with_capacity(line.len() + rewritten.len());
            result.push_str(&line[..start]);
            result.push_str(&rewritten);
            result.push_str(&line[end..]);
            result
        }
        None => line.to_string(),
    }
}
