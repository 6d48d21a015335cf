//! Structured view of an HLS tag line's attribute list.
//!
//! `#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aac",NAME="English, US",DEFAULT=YES`
//! is split into the tag name and its raw `KEY=value` entries. Quoted values
//! may contain commas. Entries keep their original bytes, so a line that is
//! parsed and serialized without mutation comes back identical.

/// A tag line split into name and comma-separated attribute entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLine {
    name: String,
    entries: Vec<String>,
}

impl TagLine {
    /// Parse `#TAG:attr-list`. Returns `None` for lines that are not tags
    /// with an attribute list.
    pub fn parse(line: &str) -> Option<Self> {
        if !line.starts_with('#') {
            return None;
        }
        let (name, attrs) = line.split_once(':')?;

        Some(Self {
            name: name.to_string(),
            entries: split_attributes(attrs),
        })
    }

    /// Tag name including the leading `#`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of `key`, with surrounding quotes removed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|idx| {
            let value = entry_value(&self.entries[idx]);
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
        })
    }

    /// Set `key` to `value`, replacing the first existing entry or appending
    /// a new one. Appending reuses a dangling empty entry (trailing comma or
    /// empty list) so the result never contains `,,`.
    pub fn set(&mut self, key: &str, value: &str) {
        let entry = format!("{}={}", key, value);

        if let Some(idx) = self.position(key) {
            self.entries[idx] = entry;
        } else if self.entries.last().is_some_and(|e| e.trim().is_empty()) {
            if let Some(last) = self.entries.last_mut() {
                *last = entry;
            }
        } else {
            self.entries.push(entry);
        }
    }

    /// Remove every entry for `key`. Returns `true` if anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| entry_key(e) != key);
        self.entries.len() != before
    }

    /// Serialize back to a single line (no line terminator).
    pub fn to_line(&self) -> String {
        format!("{}:{}", self.name, self.entries.join(","))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| entry_key(e) == key)
    }
}

fn entry_key(entry: &str) -> &str {
    entry.split_once('=').map(|(k, _)| k).unwrap_or(entry).trim()
}

fn entry_value(entry: &str) -> &str {
    entry.split_once('=').map(|(_, v)| v).unwrap_or("").trim()
}

/// Split on commas that are not inside double quotes.
fn split_attributes(attrs: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in attrs.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => entries.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    entries.push(current);

    entries
}

/// Locate the quoted value of a `URI="…"` attribute.
///
/// Only matches `URI` as a whole attribute name (preceded by `:` or `,`),
/// so `X-ASSET-URI="…"` is not picked up. Returns the byte range of the
/// value between the quotes.
pub fn find_uri_value(line: &str) -> Option<(usize, usize)> {
    const MARKER: &str = "URI=\"";

    let mut search_from = 0;
    while let Some(found) = line[search_from..].find(MARKER) {
        let marker_pos = search_from + found;
        let preceded_ok = line[..marker_pos]
            .chars()
            .next_back()
            .is_some_and(|c| c == ':' || c == ',');

        let value_start = marker_pos + MARKER.len();
        if preceded_ok {
            let closing = line[value_start..].find('"')?;
            return Some((value_start, value_start + closing));
        }
        search_from = value_start;
    }

    None
}
