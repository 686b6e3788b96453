use std::sync::LazyLock;

use regex::Regex;

/// Conversion rules, applied in order to already-escaped text.
///
/// Bold runs before italic so `**` is never eaten by the single-star rule.
/// The italic opener must touch a word so `* item` bullets survive for the
/// bullet rule.
const RULES: &[(&str, &str)] = &[
    (r"\*\*(.+?)\*\*", "<b>$1</b>"),
    (r"\*([^*\s][^*\n]*?)\*", "<i>$1</i>"),
    (r"(?m)^[ \t]*[-*•][ \t]+", "• "),
    (r"(?m)^[ \t]*(\d+)\.(?:[ \t]+|([^\d\s]))", "$1. $2"),
    (r"(?i)&lt;br\s*/?&gt;|\\n", "\n"),
    (r"\n{3,}", "\n\n"),
];

static COMPILED: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|&(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
});

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Convert model-style markdown into Telegram HTML.
///
/// Content is escaped before any rule runs, so tags only ever come from the
/// conversion itself. Rules apply line by line in a fixed order: bold, italic,
/// bullets, numbered items, explicit `<br>` / `\n` markers, then blank-line
/// collapsing. Emphasis never spans lines.
pub fn to_rich_markup(markdown: &str) -> String {
    let escaped = escape_html(&markdown.replace("\r\n", "\n"));
    let converted = COMPILED.iter().fold(escaped, |text, (re, replacement)| {
        re.replace_all(&text, *replacement).into_owned()
    });
    converted.trim().to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("**hello**", "<b>hello</b>")]
    #[case("*hello*", "<i>hello</i>")]
    #[case("**bold** and *italic*", "<b>bold</b> and <i>italic</i>")]
    #[case("<script>alert(1)</script>", "&lt;script&gt;alert(1)&lt;/script&gt;")]
    #[case("Tom & Jerry", "Tom &amp; Jerry")]
    #[case("- first\n- second", "• first\n• second")]
    #[case("* first\n  • second", "• first\n• second")]
    #[case("1.Layout\n2.   Colour", "1. Layout\n2. Colour")]
    #[case("Rated 4.5 out of 5", "Rated 4.5 out of 5")]
    #[case("1.5 kg", "1.5 kg")]
    #[case("one<br>two<BR/>three\\nfour", "one\ntwo\nthree\nfour")]
    #[case("a\n\n\n\n\nb", "a\n\nb")]
    #[case("  \n padded \n\n", "padded")]
    fn converts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(to_rich_markup(input), expected);
    }

    #[test]
    fn every_rule_compiles() {
        assert_eq!(COMPILED.len(), RULES.len());
    }

    #[test]
    fn bold_and_italic_leave_no_asterisks() {
        let out = to_rich_markup("**bold** and *italic*");
        assert!(out.contains("<b>bold</b>"));
        assert!(out.contains("<i>italic</i>"));
        assert!(!out.contains('*'));
    }

    #[test]
    fn markup_inside_emphasis_stays_escaped() {
        let out = to_rich_markup("**<img src=x onerror=alert(1)>**");
        assert_eq!(out, "<b>&lt;img src=x onerror=alert(1)&gt;</b>");
    }

    #[test]
    fn bold_across_lines_is_left_alone() {
        assert_eq!(to_rich_markup("**open\nclose**"), "**open\nclose**");
    }

    #[test]
    fn bullet_with_emphasis() {
        assert_eq!(
            to_rich_markup("- **Composition**: strong"),
            "• <b>Composition</b>: strong"
        );
    }

    #[test]
    fn line_break_markers_feed_blank_line_collapse() {
        assert_eq!(to_rich_markup("a<br><br><br><br>b"), "a\n\nb");
    }
}
