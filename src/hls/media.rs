//! Default-track mutation on `EXT-X-MEDIA` lines.
//!
//! Lets a client ask for subtitles to be on (or gone) by default without the
//! player's cooperation. Best effort: the mutation never fails, it only
//! degrades to a no-op when there is nothing to change.

use super::attributes::TagLine;
use super::split_lines;
use tracing::debug;

const MEDIA_TAG: &str = "#EXT-X-MEDIA";
const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

/// Request-scoped subtitle selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitleMode {
    #[default]
    Unchanged,
    Enable,
    Disable,
}

impl SubtitleMode {
    /// Combine the `enable_subs` / `disable_subs` flags. Disable wins.
    pub fn from_flags(enable: bool, disable: bool) -> Self {
        match (enable, disable) {
            (_, true) => SubtitleMode::Disable,
            (true, false) => SubtitleMode::Enable,
            (false, false) => SubtitleMode::Unchanged,
        }
    }
}

/// Apply `mode` to a playlist. Lines that are not mutated keep their bytes.
pub fn apply_subtitle_mode(raw: &str, mode: SubtitleMode) -> String {
    match mode {
        SubtitleMode::Unchanged => raw.to_string(),
        SubtitleMode::Disable => disable_subtitles(raw),
        SubtitleMode::Enable => enable_subtitles(raw),
    }
}

/// Parse a line as `EXT-X-MEDIA` and return it with its `TYPE` value.
fn parse_media(line: &str) -> Option<(TagLine, String)> {
    let tag = TagLine::parse(line)?;
    if tag.name() != MEDIA_TAG {
        return None;
    }
    let media_type = tag.get("TYPE").unwrap_or_default().to_ascii_uppercase();
    Some((tag, media_type))
}

fn is_audio_or_video(media_type: &str) -> bool {
    media_type == "AUDIO" || media_type == "VIDEO"
}

fn disable_subtitles(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut removed = 0usize;

    for (line, eol) in split_lines(raw) {
        if let Some((mut tag, media_type)) = parse_media(line) {
            if media_type == "SUBTITLES" {
                removed += 1;
                continue;
            }
            if is_audio_or_video(&media_type) && tag.get("DEFAULT") == Some("YES") {
                tag.set("DEFAULT", "NO");
                out.push_str(&tag.to_line());
                out.push_str(eol);
                continue;
            }
        } else if line.starts_with(STREAM_INF_TAG)
            && let Some(mut tag) = TagLine::parse(line)
            && tag.remove("SUBTITLES")
        {
            // Variants must not point at a rendition group that no longer exists
            out.push_str(&tag.to_line());
            out.push_str(eol);
            continue;
        }

        out.push_str(line);
        out.push_str(eol);
    }

    debug!("Removed {} subtitle rendition(s)", removed);
    out
}

fn enable_subtitles(raw: &str) -> String {
    let has_subtitles = split_lines(raw)
        .any(|(line, _)| matches!(parse_media(line), Some((_, t)) if t == "SUBTITLES"));
    if !has_subtitles {
        debug!("No subtitle rendition found, leaving playlist unchanged");
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len() + 32);
    let mut first_subtitle_seen = false;

    for (line, eol) in split_lines(raw) {
        let Some((mut tag, media_type)) = parse_media(line) else {
            out.push_str(line);
            out.push_str(eol);
            continue;
        };

        if is_audio_or_video(&media_type) {
            if tag.get("DEFAULT").is_some_and(|v| v != "NO") {
                tag.set("DEFAULT", "NO");
            }
        } else if media_type == "SUBTITLES" {
            if !first_subtitle_seen {
                first_subtitle_seen = true;
                if tag.get("DEFAULT") != Some("YES") {
                    tag.set("DEFAULT", "YES");
                }
                // DEFAULT=YES requires AUTOSELECT=YES when AUTOSELECT is present
                if tag.get("AUTOSELECT") == Some("NO") {
                    tag.set("AUTOSELECT", "YES");
                }
            } else if tag.get("DEFAULT") == Some("YES") {
                tag.set("DEFAULT", "NO");
            }
        }

        let mutated = tag.to_line();
        if mutated == line {
            out.push_str(line);
        } else {
            out.push_str(&mutated);
        }
        out.push_str(eol);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:4
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"Español\",LANGUAGE=\"es\",DEFAULT=YES,AUTOSELECT=YES,URI=\"audio_es.m3u8\"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=NO,AUTOSELECT=YES,URI=\"audio_en.m3u8\"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"Español (CC)\",LANGUAGE=\"es\",AUTOSELECT=NO,URI=\"subs_es.m3u8\"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=YES,URI=\"subs_en.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720,AUDIO=\"aac\",SUBTITLES=\"subs\"
index_720p.m3u8
";

    fn lines_of_type<'a>(playlist: &'a str, media_type: &str) -> Vec<&'a str> {
        let needle = format!("TYPE={}", media_type);
        playlist
            .lines()
            .filter(|l| l.starts_with(MEDIA_TAG) && l.contains(&needle))
            .collect()
    }

    #[test]
    fn flags_disable_takes_precedence() {
        assert_eq!(SubtitleMode::from_flags(true, true), SubtitleMode::Disable);
        assert_eq!(SubtitleMode::from_flags(false, true), SubtitleMode::Disable);
        assert_eq!(SubtitleMode::from_flags(true, false), SubtitleMode::Enable);
        assert_eq!(SubtitleMode::from_flags(false, false), SubtitleMode::Unchanged);
    }

    #[test]
    fn unchanged_is_identity() {
        assert_eq!(apply_subtitle_mode(MASTER, SubtitleMode::Unchanged), MASTER);
    }

    #[test]
    fn disable_removes_all_subtitle_lines() {
        let out = apply_subtitle_mode(MASTER, SubtitleMode::Disable);
        assert!(lines_of_type(&out, "SUBTITLES").is_empty());
        assert!(!out.contains("TYPE=SUBTITLES"));
    }

    #[test]
    fn disable_clears_audio_defaults() {
        let out = apply_subtitle_mode(MASTER, SubtitleMode::Disable);
        let audio = lines_of_type(&out, "AUDIO");
        assert_eq!(audio.len(), 2);
        assert!(audio.iter().all(|l| !l.contains("DEFAULT=YES")));
        assert!(audio[0].contains("DEFAULT=NO,AUTOSELECT=YES"));
    }

    #[test]
    fn disable_drops_subtitle_group_from_variants() {
        let out = apply_subtitle_mode(MASTER, SubtitleMode::Disable);
        assert!(out.contains(
            "#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720,AUDIO=\"aac\"\n"
        ));
        assert!(out.ends_with("index_720p.m3u8\n"));
    }

    #[test]
    fn enable_selects_first_subtitle_only() {
        let out = apply_subtitle_mode(MASTER, SubtitleMode::Enable);
        let subs = lines_of_type(&out, "SUBTITLES");
        assert_eq!(subs.len(), 2);
        assert!(subs[0].contains("DEFAULT=YES"));
        assert!(subs[0].contains("AUTOSELECT=YES"));
        assert!(subs[1].contains("DEFAULT=NO"));
        assert_eq!(
            out.lines().filter(|l| l.contains("TYPE=SUBTITLES") && l.contains("DEFAULT=YES")).count(),
            1
        );
    }

    #[test]
    fn enable_forces_audio_default_no() {
        let out = apply_subtitle_mode(MASTER, SubtitleMode::Enable);
        assert!(
            lines_of_type(&out, "AUDIO")
                .iter()
                .all(|l| l.contains("DEFAULT=NO"))
        );
    }

    #[test]
    fn enable_inserts_default_with_valid_commas() {
        let out = apply_subtitle_mode(MASTER, SubtitleMode::Enable);
        let first = lines_of_type(&out, "SUBTITLES")[0];
        assert_eq!(
            first,
            "#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"Español (CC)\",LANGUAGE=\"es\",AUTOSELECT=YES,URI=\"subs_es.m3u8\",DEFAULT=YES"
        );
        assert!(!out.contains(",,"));
    }

    #[test]
    fn enable_is_idempotent() {
        let once = apply_subtitle_mode(MASTER, SubtitleMode::Enable);
        let twice = apply_subtitle_mode(&once, SubtitleMode::Enable);
        assert_eq!(once, twice);
    }

    #[test]
    fn enable_without_subtitles_is_noop() {
        let playlist = "#EXTM3U\n#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"a\",NAME=\"x\",DEFAULT=YES\n#EXT-X-STREAM-INF:BANDWIDTH=1\nv.m3u8\n";
        assert_eq!(apply_subtitle_mode(playlist, SubtitleMode::Enable), playlist);
    }

    #[test]
    fn disable_without_subtitles_only_touches_defaults() {
        let playlist = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nv.m3u8\n";
        assert_eq!(apply_subtitle_mode(playlist, SubtitleMode::Disable), playlist);
    }

    #[test]
    fn crlf_terminators_are_preserved() {
        let playlist = "#EXTM3U\r\n#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"s\",NAME=\"x\"\r\n#EXT-X-STREAM-INF:BANDWIDTH=1,SUBTITLES=\"s\"\r\nv.m3u8";
        let out = apply_subtitle_mode(playlist, SubtitleMode::Enable);
        assert_eq!(
            out,
            "#EXTM3U\r\n#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"s\",NAME=\"x\",DEFAULT=YES\r\n#EXT-X-STREAM-INF:BANDWIDTH=1,SUBTITLES=\"s\"\r\nv.m3u8"
        );
    }
}
