//! HTML to readable text.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Elements dropped together with their content.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe", "form",
];

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex"));

static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BOILERPLATE_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("Invalid regex"))
        .collect()
});

static MAIN_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:article|main)\b[^>]*>(.*)</(?:article|main)\s*>").expect("Invalid regex"));

static BODY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").expect("Invalid regex"));

static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:br\s*/?|/?(?:p|div|li|ul|ol|h[1-6]|tr|table|section|blockquote|pre)\b[^>]*)>")
        .expect("Invalid regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"));

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("Invalid regex"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("Invalid regex"));

/// Convert an HTML document to plain text.
///
/// Boilerplate elements are removed, the `<article>`/`<main>` region is
/// preferred over the whole body, block elements become line breaks and
/// entities are decoded. Runs of blank lines collapse to one paragraph break.
pub fn html_to_text(html: &str) -> String {
    let mut doc = COMMENT.replace_all(html, "").into_owned();
    for re in BOILERPLATE.iter() {
        doc = re.replace_all(&doc, "").into_owned();
    }

    let region = MAIN_CONTENT
        .captures(&doc)
        .or_else(|| BODY.captures(&doc))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| doc.clone());

    let broken = BLOCK_BREAK.replace_all(&region, "\n");
    let stripped = TAG.replace_all(&broken, "");
    let decoded = decode_entities(&stripped);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in decoded.lines() {
        let line = SPACES.replace_all(line, " ").trim().to_string();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs.join("\n\n")
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "copy" => '©',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_boilerplate_and_prefers_article() {
        let html = r#"<html><head><title>T</title><style>p { color: red }</style></head>
<body><nav><a href="/">Home</a></nav>
<article><h1>Rust &amp; Audio</h1><p>First   paragraph.</p><script>alert(1)</script>
<p>Second<br>line &#8212; done&hellip;</p></article>
<footer>Copyright</footer></body></html>"#;

        let text = html_to_text(html);
        assert_eq!(text, "Rust & Audio\n\nFirst paragraph.\n\nSecond\nline — done…");
    }

    #[test]
    fn test_falls_back_to_body() {
        let html = "<html><body><div>One</div><!-- hidden --><div>Two &lt;3</div></body></html>";
        assert_eq!(html_to_text(html), "One\n\nTwo <3");
    }

    #[test]
    fn test_unknown_entities_are_kept() {
        assert_eq!(decode_entities("a &bogus; b &#x41;"), "a &bogus; b A");
    }
}
