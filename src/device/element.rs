use serde::{Deserialize, Serialize};

/// Screen rectangle of a UI element, as reported by a hierarchy dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub center_x: u32,
    pub center_y: u32,
}

impl Bounds {
    /// Build bounds from the two corners. Returns `None` for a negative rectangle.
    pub fn from_corners(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Self> {
        if x2 < x1 || y2 < y1 {
            return None;
        }
        Some(Bounds {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            center_x: x1 + (x2 - x1) / 2,
            center_y: y1 + (y2 - y1) / 2,
        })
    }

    /// Parse the `[x1,y1][x2,y2]` form used by uiautomator.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix('[')?;
        let (first, rest) = rest.split_once("][")?;
        let second = rest.strip_suffix(']')?;

        let (x1, y1) = parse_point(first)?;
        let (x2, y2) = parse_point(second)?;
        Self::from_corners(x1, y1, x2, y2)
    }
}

fn parse_point(s: &str) -> Option<(u32, u32)> {
    let (x, y) = s.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// One UI element from a hierarchy dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Widget class, e.g. `android.widget.Switch`; "unknown" when absent
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub content_desc: String,
    /// `text` when non-empty, otherwise `content_desc`
    pub label: String,
    pub bounds: Bounds,
}

impl Element {
    pub fn new(kind: &str, text: &str, content_desc: &str, bounds: Bounds) -> Self {
        let label = if text.is_empty() { content_desc } else { text };
        Element {
            kind: kind.to_string(),
            text: text.to_string(),
            content_desc: content_desc.to_string(),
            label: label.to_string(),
            bounds,
        }
    }

    /// Case-insensitive substring match against label, text or content-desc.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.label, &self.text, &self.content_desc]
            .iter()
            .any(|field| !field.is_empty() && field.to_lowercase().contains(&needle))
    }

    /// Whether the element carries any human-readable content.
    pub fn has_content(&self) -> bool {
        !self.label.is_empty() || !self.text.is_empty() || !self.content_desc.is_empty()
    }

    pub fn center(&self) -> (u32, u32) {
        (self.bounds.center_x, self.bounds.center_y)
    }
}
