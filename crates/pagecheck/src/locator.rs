//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a value: a selector plus optional scope and index. It is
//! never bound to a live element. Every use re-resolves it against the
//! session, so DOM changes between steps are always observed.
//!
//! # Selector syntax
//!
//! | Form                     | Kind                              |
//! |--------------------------|-----------------------------------|
//! | `.product_pod a`         | CSS                               |
//! | `css=li.next a`          | CSS (explicit)                    |
//! | `//a[contains(.,"X")]`   | XPath                             |
//! | `xpath=//h1`             | XPath (explicit)                  |
//! | `text=Travel`            | Text, case-insensitive substring  |
//! | `text="Travel"`          | Text, exact after trimming        |
//! | `a:has-text("Books")`    | CSS filtered by contained text    |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{PagecheckError, PagecheckResult};
use crate::session::{PageSession, Resolved};

/// Selector syntax family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectorKind {
    /// CSS selector
    Css,
    /// XPath expression
    XPath,
    /// Visible-text selector
    Text,
    /// CSS selector narrowed by contained text
    CssWithText,
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "li.next a")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Text content selector
    Text {
        /// Text to look for
        text: String,
        /// Require the whole trimmed text to equal `text`
        exact: bool,
    },
    /// CSS selector with text filter
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a case-insensitive text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: false,
        }
    }

    /// Parse a selector string
    ///
    /// # Errors
    ///
    /// Returns error for empty selectors and unterminated `:has-text(` filters
    pub fn parse(raw: &str) -> PagecheckResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PagecheckError::InvalidSelector {
                selector: raw.to_string(),
                message: "selector is empty".to_string(),
            });
        }

        if let Some(rest) = trimmed.strip_prefix("xpath=") {
            return Ok(Self::XPath(rest.to_string()));
        }
        if trimmed.starts_with("//") || trimmed.starts_with("(//") {
            return Ok(Self::XPath(trimmed.to_string()));
        }
        if let Some(rest) = trimmed.strip_prefix("text=") {
            return Ok(match unquote(rest) {
                Some(inner) => Self::Text {
                    text: inner.to_string(),
                    exact: true,
                },
                None => Self::text(rest),
            });
        }
        let css = trimmed.strip_prefix("css=").unwrap_or(trimmed);

        if let Some(start) = css.find(":has-text(") {
            let base = &css[..start];
            let inner = &css[start + ":has-text(".len()..];
            let Some(arg) = inner.strip_suffix(')') else {
                return Err(PagecheckError::InvalidSelector {
                    selector: raw.to_string(),
                    message: "unterminated :has-text(".to_string(),
                });
            };
            let text = unquote(arg).unwrap_or(arg).to_string();
            let base = if base.is_empty() { "*" } else { base };
            return Ok(Self::CssWithText {
                css: base.to_string(),
                text,
            });
        }

        Ok(Self::Css(css.to_string()))
    }

    /// Syntax family of this selector
    #[must_use]
    pub const fn kind(&self) -> SelectorKind {
        match self {
            Self::Css(_) => SelectorKind::Css,
            Self::XPath(_) => SelectorKind::XPath,
            Self::Text { .. } => SelectorKind::Text,
            Self::CssWithText { .. } => SelectorKind::CssWithText,
        }
    }

    /// JavaScript expression yielding the matches under `root`, in document order
    fn to_js_query(&self, root: &str) -> String {
        match self {
            Self::Css(s) => format!("Array.from({root}.querySelectorAll({}))", js_str(s)),
            Self::XPath(x) => format!("__pcXPath({root}, {})", js_str(x)),
            Self::Text { text, exact } => {
                format!("__pcText({root}, {}, {exact})", js_str(text))
            }
            Self::CssWithText { css, text } => format!(
                "Array.from({root}.querySelectorAll({})).filter(e => __pcHas(e, {}))",
                js_str(css),
                js_str(text)
            ),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "{s}"),
            Self::XPath(x) if x.starts_with("//") || x.starts_with("(//") => write!(f, "{x}"),
            Self::XPath(x) => write!(f, "xpath={x}"),
            Self::Text { text, exact: true } => write!(f, "text=\"{text}\""),
            Self::Text { text, exact: false } => write!(f, "text={text}"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text(\"{text}\")"),
        }
    }
}

fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    ['"', '\'']
        .iter()
        .find_map(|q| s.strip_prefix(*q).and_then(|rest| rest.strip_suffix(*q)))
}

/// Encode a Rust string as a JavaScript string literal
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Helpers shared by every generated query.
const JS_PRELUDE: &str = r"
const __pcNorm = s => (s || '').replace(/\s+/g, ' ').trim();
const __pcHas = (e, t) => __pcNorm(e.textContent).toLowerCase().includes(t.toLowerCase());
const __pcXPath = (root, x) => {
  const snap = document.evaluate(x, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
  const out = [];
  for (let i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i));
  return out;
};
const __pcText = (root, t, exact) => {
  const hit = e => exact ? __pcNorm(e.textContent) === t : __pcHas(e, t);
  return Array.from(root.querySelectorAll('*'))
    .filter(e => e.closest('head') === null && hit(e) && !Array.from(e.children).some(hit));
};
const __pcVisible = e => {
  const r = e.getBoundingClientRect();
  const st = window.getComputedStyle(e);
  return r.width > 0 && r.height > 0 && st.visibility !== 'hidden' && st.display !== 'none';
};
";

/// A deferred reference to zero or more elements.
///
/// Cloning is cheap enough to do freely; scoping and indexing return new
/// locators and never mutate the original.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    selector: Selector,
    scope: Option<Box<Locator>>,
    index: Option<usize>,
}

impl Locator {
    /// Create a locator from a selector string
    ///
    /// Unparseable input falls back to a literal CSS selector, which then
    /// fails on first use with the browser's own error.
    #[must_use]
    pub fn new(selector: &str) -> Self {
        let selector = Selector::parse(selector).unwrap_or_else(|_| Selector::css(selector));
        Self::from_selector(selector)
    }

    /// Create a locator from a parsed selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            scope: None,
            index: None,
        }
    }

    /// Narrow to the first match in document order
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// Narrow to the `n`th match (zero-based)
    #[must_use]
    pub fn nth(&self, n: usize) -> Self {
        Self {
            index: Some(n),
            ..self.clone()
        }
    }

    /// Locate `selector` inside every element this locator matches
    #[must_use]
    pub fn locator(&self, selector: &str) -> Self {
        let mut child = Self::new(selector);
        child.scope = Some(Box::new(self.clone()));
        child
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the selector kind
    #[must_use]
    pub const fn kind(&self) -> SelectorKind {
        self.selector.kind()
    }

    /// Get the enclosing locator, if scoped
    #[must_use]
    pub fn scope(&self) -> Option<&Self> {
        self.scope.as_deref()
    }

    /// Get the index narrowing, if any
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Bind to a session for a single step
    pub fn resolve<'s>(&'s self, session: &'s dyn PageSession) -> Resolved<'s> {
        Resolved::new(self, session)
    }

    /// JavaScript expression evaluating to the matched elements
    #[must_use]
    pub fn js_elements(&self) -> String {
        let mut chain = Vec::new();
        let mut cur = Some(self);
        while let Some(loc) = cur {
            chain.push(loc);
            cur = loc.scope();
        }

        let mut body = String::from("let els = [document];\n");
        for loc in chain.iter().rev() {
            body.push_str(&format!(
                "els = [...new Set(els.flatMap(r => {}))];\n",
                loc.selector.to_js_query("r")
            ));
            if let Some(i) = loc.index {
                body.push_str(&format!("els = els.length > {i} ? [els[{i}]] : [];\n"));
            }
        }
        format!("(() => {{ {JS_PRELUDE}\n{body}return els; }})()")
    }

    /// JavaScript returning the match count
    #[must_use]
    pub fn js_count(&self) -> String {
        format!("{}.length", self.js_elements())
    }

    /// JavaScript returning the normalized text of every match
    #[must_use]
    pub fn js_texts(&self) -> String {
        format!(
            "{}.map(e => (e.textContent || '').trim())",
            self.js_elements()
        )
    }

    /// JavaScript returning one attribute of every match (null when absent)
    #[must_use]
    pub fn js_attributes(&self, name: &str) -> String {
        format!(
            "{}.map(e => e.getAttribute({}))",
            self.js_elements(),
            js_str(name)
        )
    }

    /// JavaScript returning the visibility of every match
    #[must_use]
    pub fn js_visibility(&self) -> String {
        format!(
            "(() => {{ {JS_PRELUDE}\nreturn {}.map(__pcVisible); }})()",
            self.js_elements()
        )
    }

    /// JavaScript clicking the first match; returns `missing`, `hidden`, `disabled` or `ok`
    #[must_use]
    pub fn js_click(&self) -> String {
        format!(
            "(() => {{ {JS_PRELUDE}\nconst e = {}[0];\n\
             if (!e) return 'missing';\n\
             if (!__pcVisible(e)) return 'hidden';\n\
             if (e.disabled) return 'disabled';\n\
             e.scrollIntoView({{block: 'center'}});\n\
             e.click();\n\
             return 'ok'; }})()",
            self.js_elements()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{scope} >> ")?;
        }
        write!(f, "{}", self.selector)?;
        if let Some(i) = self.index {
            write!(f, " >> nth={i}")?;
        }
        Ok(())
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}
