//! Locating inlineable references in an HTML document.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::report::SourceKind;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<(script|link|img)\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("valid regex")
});

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid regex")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

static SCRIPT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</script\s*>").expect("valid regex"));

/// An element attribute. `value` is `None` for bare attributes like `async`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// One element carrying an inlineable reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub kind: SourceKind,
    /// Lowercased element name.
    pub tag: String,
    /// Byte range of the whole element, including `</script>` for scripts.
    pub range: Range<usize>,
    pub attributes: Vec<Attribute>,
    pub reference: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        attr(&self.attributes, name)
    }

    /// Attributes other than those named, rendered for re-emission.
    pub fn render_attrs_without(&self, skip: &[&str]) -> String {
        render_attrs(
            self.attributes
                .iter()
                .filter(|a| !skip.iter().any(|s| a.name.eq_ignore_ascii_case(s))),
        )
    }

    /// The element source text.
    pub fn original<'a>(&self, html: &'a str) -> &'a str {
        &html[self.range.clone()]
    }
}

fn attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .and_then(|a| a.value.as_deref())
}

pub fn render_attrs<'a>(attrs: impl Iterator<Item = &'a Attribute>) -> String {
    let mut out = String::new();
    for a in attrs {
        out.push(' ');
        out.push_str(&a.name);
        if let Some(value) = &a.value {
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
    }
    out
}

pub fn parse_attributes(raw: &str) -> Vec<Attribute> {
    ATTR.captures_iter(raw)
        .map(|c| Attribute {
            name: c[1].to_string(),
            value: c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Every script, stylesheet and image reference outside comments, in document order.
pub fn scan(html: &str) -> Vec<Element> {
    let comments: Vec<Range<usize>> = COMMENT.find_iter(html).map(|m| m.range()).collect();
    let in_comment = |pos: usize| comments.iter().any(|r| r.contains(&pos));

    let mut elements = Vec::new();
    let mut resume = 0;
    for caps in TAG.captures_iter(html) {
        let whole = caps.get(0).expect("group 0 always matches");
        if whole.start() < resume || in_comment(whole.start()) {
            continue;
        }
        let tag = caps[1].to_ascii_lowercase();
        let attributes = parse_attributes(&caps[2]);

        let (kind, reference) = match tag.as_str() {
            "script" => (SourceKind::Script, attr(&attributes, "src")),
            "img" => (SourceKind::Image, attr(&attributes, "src")),
            _ => {
                let stylesheet = attr(&attributes, "rel")
                    .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
                (SourceKind::Css, attr(&attributes, "href").filter(|_| stylesheet))
            }
        };
        let Some(reference) = reference.map(str::to_string) else {
            continue;
        };

        let mut end = whole.end();
        if kind == SourceKind::Script {
            if let Some(close) = SCRIPT_CLOSE.find_at(html, end) {
                end = close.end();
            }
        }
        resume = end;

        elements.push(Element {
            kind,
            tag,
            range: whole.start()..end,
            attributes,
            reference,
        });
    }
    elements
}
