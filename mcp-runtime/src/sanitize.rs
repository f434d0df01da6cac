//! Markup sanitization for note contents.
//!
//! Productboard note bodies arrive as HTML and are mostly markup by
//! weight. The consumer on the other side of the MCP transport pays per
//! token, so the goal here is compact readable text, not faithful
//! rendering. The pipeline is a fixed sequence of regex passes; order
//! matters because later passes assume earlier ones already ran (e.g.
//! anchors must be unwrapped before the generic tag strip, URLs deleted
//! after entity decoding).

use std::sync::LazyLock;

use regex::{Captures, Regex};

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?</style\s*>").unwrap());
static TABLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table.*?</table\s*>").unwrap());
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img[^>]*>").unwrap());

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?\s*>").unwrap());
static BLOCK_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(?:p|div|h[1-6]|li)\s*>").unwrap());
static BLOCK_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:p|div|h[1-6])[^>]*>").unwrap());
static LIST_ITEM_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li[^>]*>").unwrap());

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<a[^>]*>(.*?)</a\s*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BARE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static DECIMAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d+);").unwrap());
static HEX_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#x([0-9a-fA-F]+);").unwrap());

static ABSOLUTE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static WWW_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bwww\.\S+").unwrap());

static CONTROL_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\x0B\x0C\r]").unwrap());
static TRAILING_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static EXCESS_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// Reduce an HTML fragment to compact plain text preserving reading
/// order. Empty input passes through unchanged. Malformed markup is
/// handled best-effort: anything the structural passes miss is removed
/// by the generic tag strip.
pub fn sanitize_markup(raw: &str) -> String {
    if raw.is_empty() {
        return raw.to_string();
    }

    // 1) Remove heavy blocks outright, descendants included.
    let text = SCRIPT_BLOCK.replace_all(raw, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = TABLE_BLOCK.replace_all(&text, "");
    let text = IMG_TAG.replace_all(&text, "");

    // 2) Structure to newlines and bullets.
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = BLOCK_CLOSE.replace_all(&text, "\n");
    let text = BLOCK_OPEN.replace_all(&text, "");
    let text = LIST_ITEM_OPEN.replace_all(&text, "- ");

    // 3) Unwrap anchors: keep inner text, drop href and attributes.
    let text = ANCHOR.replace_all(&text, "${1}");

    // 4) Strip whatever tags remain, known or not.
    let text = ANY_TAG.replace_all(&text, "");

    // 5) Minimal entity set.
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    let text = DECIMAL_ENTITY.replace_all(&text, |caps: &Captures| {
        decode_code_point(caps[1].parse::<u32>().ok()).unwrap_or_else(|| caps[0].to_string())
    });
    let text = HEX_ENTITY.replace_all(&text, |caps: &Captures| {
        decode_code_point(u32::from_str_radix(&caps[1], 16).ok())
            .unwrap_or_else(|| caps[0].to_string())
    });

    // 6) Delete URLs outright; a placeholder would still cost tokens.
    let text = ABSOLUTE_URL.replace_all(&text, "");
    let text = WWW_TOKEN.replace_all(&text, "");

    // 7) Collapse whitespace and trim.
    let text = CONTROL_WHITESPACE.replace_all(&text, " ");
    let text = text.replace('\u{00A0}', " ");
    // Spaces only, so blank lines survive the next pass.
    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = EXCESS_SPACES.replace_all(&text, " ");

    text.trim().to_string()
}

/// Bare tag removal, nothing else. Used by the feature search matcher,
/// which only needs markup out of the way for substring comparison.
pub fn strip_tags(raw: &str) -> String {
    BARE_TAG.replace_all(raw, "").into_owned()
}

fn decode_code_point(code: Option<u32>) -> Option<String> {
    code.and_then(char::from_u32).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_table_and_strips_tags() {
        let input = "<p>Hello <b>world</b></p><table><tr><td>x</td></tr></table>";
        assert_eq!(sanitize_markup(input), "Hello world");
    }

    #[test]
    fn removes_script_and_style_with_content() {
        let input = "before<script>var x = 1;</script>mid<style>.a { color: red }</style>after";
        assert_eq!(sanitize_markup(input), "beforemidafter");
    }

    #[test]
    fn removes_images_outright() {
        assert_eq!(
            sanitize_markup(r#"see <img src="chart.png" alt="chart"> here"#),
            "see here"
        );
    }

    #[test]
    fn converts_structure_to_newlines_and_bullets() {
        let input = "<h2>Title</h2><p>First</p><ul><li>one</li><li>two</li></ul>";
        assert_eq!(sanitize_markup(input), "Title\nFirst\n- one\n- two");
    }

    #[test]
    fn line_breaks_become_newlines() {
        assert_eq!(sanitize_markup("a<br>b<br/>c<br />d"), "a\nb\nc\nd");
    }

    #[test]
    fn unwraps_anchors_keeping_inner_text() {
        assert_eq!(
            sanitize_markup(r#"read <a href="https://example.com/doc" target="_blank">the doc</a>"#),
            "read the doc"
        );
    }

    #[test]
    fn decodes_minimal_entity_set() {
        assert_eq!(
            sanitize_markup("a&nbsp;b &amp; c &lt;d&gt; &#65; &#x42;"),
            "a b & c <d> A B"
        );
    }

    #[test]
    fn invalid_numeric_entity_is_left_verbatim() {
        // 0xD800 is a surrogate, not a valid scalar value.
        assert_eq!(sanitize_markup("x &#xD800; y"), "x &#xD800; y");
        assert_eq!(sanitize_markup("x &#1114112; y"), "x &#1114112; y");
    }

    #[test]
    fn deletes_urls_preserving_surrounding_text() {
        assert_eq!(
            sanitize_markup("Visit https://example.com/path?x=1 now"),
            "Visit now"
        );
        assert_eq!(sanitize_markup("at www.example.com today"), "at today");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(sanitize_markup("a\t\tb\nc\n\n\n\nd   e"), "a b\nc\n\nd e");
        // A single blank line is the maximum vertical gap.
        assert_eq!(sanitize_markup("one\n\ntwo"), "one\n\ntwo");
    }

    #[test]
    fn trims_spaces_before_newlines() {
        assert_eq!(sanitize_markup("a  \nb"), "a\nb");
        // The trim never merges lines, even blank ones.
        assert_eq!(sanitize_markup("a \n \nb"), "a\n\nb");
    }

    #[test]
    fn empty_input_is_unchanged() {
        assert_eq!(sanitize_markup(""), "");
    }

    #[test]
    fn idempotent_on_clean_text() {
        let once = sanitize_markup("Plain text\n\nwith a blank line and & symbols");
        assert_eq!(sanitize_markup(&once), once);
    }

    #[test]
    fn strip_tags_removes_markup_only() {
        assert_eq!(
            strip_tags("<p>Dark <b>mode</b> support</p>"),
            "Dark mode support"
        );
    }
}
