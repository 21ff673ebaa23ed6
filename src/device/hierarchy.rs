use thiserror::Error;

use crate::device::element::{Bounds, Element};

#[derive(Debug, Error)]
pub enum HierarchyError {
    /// The dump is not well-formed markup
    #[error("Hierarchy dump is not well-formed: {0}")]
    Markup(#[from] roxmltree::Error),

    /// A node carries a bounds attribute that is not `[x1,y1][x2,y2]`
    #[error("Node {index} has malformed bounds '{raw}'")]
    MalformedBounds { index: usize, raw: String },
}

/// Elements of one dump plus the nodes that could not become elements.
#[derive(Debug, Default)]
pub struct ParsedDump {
    /// Well-formed nodes in document order
    pub elements: Vec<Element>,
    /// One `MalformedBounds` per rejected node
    pub rejected: Vec<HierarchyError>,
}

/// Parse a uiautomator hierarchy dump into element descriptors.
///
/// Nodes are returned in document order. A node without a `bounds`
/// attribute is skipped, as is one with neither a label nor a class.
/// A node with malformed bounds is rejected on its own and the rest of
/// the screen is kept. Only broken markup fails the whole dump.
/// Empty input yields nothing.
pub fn parse_hierarchy(dump: &str) -> Result<ParsedDump, HierarchyError> {
    let Some(xml) = extract_xml_payload(dump) else {
        return Ok(ParsedDump::default());
    };

    let doc = roxmltree::Document::parse(xml)?;
    let mut parsed = ParsedDump::default();

    for (index, node) in doc
        .descendants()
        .filter(|n| n.has_tag_name("node"))
        .enumerate()
    {
        let Some(raw_bounds) = node.attribute("bounds") else {
            continue;
        };
        let Some(bounds) = Bounds::parse(raw_bounds) else {
            parsed.rejected.push(HierarchyError::MalformedBounds {
                index,
                raw: raw_bounds.to_string(),
            });
            continue;
        };

        let class = node.attribute("class");
        let text = node.attribute("text").unwrap_or("");
        let content_desc = node.attribute("content-desc").unwrap_or("");

        if text.is_empty() && content_desc.is_empty() && class.is_none() {
            continue;
        }

        parsed.elements.push(Element::new(
            class.unwrap_or("unknown"),
            text,
            content_desc,
            bounds,
        ));
    }

    Ok(parsed)
}

/// Trim anything outside the outermost markup.
///
/// `exec-out uiautomator dump /dev/fd/1` prints a trailer line after the
/// XML ("UI hierchary dumped to: ..."), which a strict parser rejects.
fn extract_xml_payload(dump: &str) -> Option<&str> {
    let start = dump.find('<')?;
    let end = dump.rfind('>')?;
    if end < start {
        return None;
    }
    Some(&dump[start..=end])
}
