//! HTML inspection and rich-text normalization

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::source::HtmlTransformator;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("script pattern is valid"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("style pattern is valid"));
static FONT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?font\b[^>]*>").expect("font pattern is valid"));
static CLASS_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+class\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("class pattern is valid")
});
static BOLD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)b(\s[^>]*)?>").expect("bold pattern is valid"));
static ITALIC_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)i(\s[^>]*)?>").expect("italic pattern is valid"));
static EMPTY_PARAGRAPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<p\b[^>]*>(\s|&nbsp;|&#160;|\u{a0}|<br\s*/?>)*</p>")
        .expect("empty paragraph pattern is valid")
});
static IMAGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("image pattern is valid"));
static IFRAME_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<iframe\b[^>]*>.*?</iframe>|<iframe\b[^>]*/>").expect("iframe pattern is valid")
});
static SRC_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\ssrc\s*=\s*("([^"]*)"|'([^']*)')"#).expect("src pattern is valid")
});

/// An `<img>` found in a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
}

/// An `<a>` found in a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRef {
    pub href: String,
    pub text: String,
}

fn select<'a>(fragment: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => fragment.select(&selector).collect(),
        Err(e) => {
            log::warn!("Invalid selector '{}': {:?}", css, e);
            Vec::new()
        }
    }
}

/// Whether the fragment holds a `<script>` element.
///
/// The parser recovers from malformed markup, so broken input simply
/// reports whatever script elements it could still find.
pub fn contains_script(html: &str) -> bool {
    if html.trim().is_empty() {
        return false;
    }
    let fragment = Html::parse_fragment(html);
    !select(&fragment, "script").is_empty()
}

pub fn images(html: &str) -> Vec<ImageRef> {
    let fragment = Html::parse_fragment(html);
    select(&fragment, "img[src]")
        .into_iter()
        .map(|img| ImageRef {
            src: img.value().attr("src").unwrap_or_default().to_string(),
            alt: img.value().attr("alt").unwrap_or_default().to_string(),
        })
        .collect()
}

pub fn anchors(html: &str) -> Vec<AnchorRef> {
    let fragment = Html::parse_fragment(html);
    select(&fragment, "a[href]")
        .into_iter()
        .map(|a| AnchorRef {
            href: a.value().attr("href").unwrap_or_default().to_string(),
            text: a.text().collect::<String>().trim().to_string(),
        })
        .collect()
}

/// Visible text of a fragment with whitespace collapsed
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Default [`HtmlTransformator`]: strips what the modern text model cannot
/// render and normalizes the rest
#[derive(Debug, Clone, Copy, Default)]
pub struct RichTextTransformator;

impl RichTextTransformator {
    fn placeholder(kind: &str, tag: &str) -> String {
        let src = SRC_ATTRIBUTE
            .captures(tag)
            .and_then(|c| c.get(2).or_else(|| c.get(3)))
            .map(|m| m.as_str())
            .unwrap_or_default();
        format!(
            "<p>[{}: {}]</p>",
            kind,
            html_escape::encode_text(&html_escape::decode_html_entities(src))
        )
    }
}

impl HtmlTransformator for RichTextTransformator {
    fn is_empty_paragraph(&self, html: &str) -> bool {
        let fragment = Html::parse_fragment(html);
        let has_media = !select(&fragment, "img, iframe, video, object, embed").is_empty();
        let text = fragment.root_element().text().collect::<String>();
        !has_media && text.chars().all(|c| c.is_whitespace() || c == '\u{a0}')
    }

    fn transform(&self, html: &str, use_placeholders: bool) -> String {
        let html = SCRIPT_BLOCK.replace_all(html, "");
        let html = STYLE_BLOCK.replace_all(&html, "");
        let html = FONT_TAG.replace_all(&html, "");
        let html = CLASS_ATTRIBUTE.replace_all(&html, "");
        let html = BOLD_TAG.replace_all(&html, "<${1}strong>");
        let html = ITALIC_TAG.replace_all(&html, "<${1}em>");

        let html = if use_placeholders {
            let html = IMAGE_TAG.replace_all(&html, |c: &regex::Captures| {
                Self::placeholder("Image", &c[0])
            });
            IFRAME_BLOCK
                .replace_all(&html, |c: &regex::Captures| Self::placeholder("Embed", &c[0]))
                .into_owned()
        } else {
            let html = IMAGE_TAG.replace_all(&html, "");
            IFRAME_BLOCK.replace_all(&html, "").into_owned()
        };

        EMPTY_PARAGRAPH.replace_all(&html, "").trim().to_string()
    }
}
