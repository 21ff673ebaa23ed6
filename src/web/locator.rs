use std::fmt;

use serde::{Deserialize, Serialize};

/// How the browser server should find an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// ARIA role plus accessible name. Non-exact names match as a
    /// case-insensitive substring.
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        exact: bool,
    },
    /// CSS selector
    Css { selector: String },
    /// Visible text
    Text { text: String },
    /// `child` searched inside the first match of `parent`
    Within {
        parent: Box<Locator>,
        child: Box<Locator>,
    },
}

impl Locator {
    pub fn role(role: &str, name: &str) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: Some(name.to_string()),
            exact: false,
        }
    }

    pub fn role_exact(role: &str, name: &str) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: Some(name.to_string()),
            exact: true,
        }
    }

    pub fn any_role(role: &str) -> Self {
        Locator::Role {
            role: role.to_string(),
            name: None,
            exact: false,
        }
    }

    pub fn css(selector: &str) -> Self {
        Locator::Css {
            selector: selector.to_string(),
        }
    }

    pub fn text(text: &str) -> Self {
        Locator::Text {
            text: text.to_string(),
        }
    }

    pub fn within(self, child: Locator) -> Self {
        Locator::Within {
            parent: Box::new(self),
            child: Box::new(child),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Role { role, name: Some(name), exact: true } => {
                write!(f, "role={}[name=\"{}\" exact]", role, name)
            }
            Locator::Role { role, name: Some(name), .. } => {
                write!(f, "role={}[name=\"{}\"]", role, name)
            }
            Locator::Role { role, name: None, .. } => write!(f, "role={}", role),
            Locator::Css { selector } => write!(f, "css={}", selector),
            Locator::Text { text } => write!(f, "text={}", text),
            Locator::Within { parent, child } => write!(f, "{} >> {}", parent, child),
        }
    }
}

/// Page load milestones, named as the browser server expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

/// URL glob match: `**` spans any characters, `*` stops at `/`.
/// A pattern without wildcards must equal the URL.
pub fn glob_match(pattern: &str, url: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = url.chars().collect();
    match_from(&p, &t)
}

fn match_from(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') if p.get(1) == Some(&'*') => {
            let rest = &p[2..];
            (0..=t.len()).any(|i| match_from(rest, &t[i..]))
        }
        Some('*') => {
            let rest = &p[1..];
            for i in 0..=t.len() {
                if match_from(rest, &t[i..]) {
                    return true;
                }
                if i < t.len() && t[i] == '/' {
                    break;
                }
            }
            false
        }
        Some(c) => t.first() == Some(c) && match_from(&p[1..], &t[1..]),
    }
}
