use crate::{chunk::to_safe_fragments, html::to_rich_markup};

/// Room kept free in every fragment for the `(i/n)` position tag.
pub const POSITION_TAG_RESERVE: usize = 24;

/// Split markdown into Telegram HTML messages that each fit `limit` bytes.
///
/// The markdown source is chunked first and each chunk rendered on its own,
/// so no tag is ever cut in half. Escaping can grow a chunk past `limit`
/// (`<` becomes `&lt;`); such chunks are split again at half the size until
/// they fit. Chunks that render to nothing are dropped.
pub fn render_fragments(markdown: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in to_safe_fragments(markdown, limit) {
        render_into(&chunk, limit, &mut out);
    }
    out
}

fn render_into(chunk: &str, limit: usize, out: &mut Vec<String>) {
    let html = to_rich_markup(chunk);
    let indivisible = chunk.chars().nth(1).is_none();
    if html.len() <= limit || indivisible {
        if !html.is_empty() {
            out.push(html);
        }
        return;
    }
    for piece in to_safe_fragments(chunk, (chunk.len() / 2).max(1)) {
        render_into(&piece, limit, out);
    }
}

/// Render `markdown` and tag each message with its position when the text
/// needs more than one message.
///
/// The tag is written as `(i/n)` on its own line above the body. Space for
/// it is reserved only once splitting is unavoidable, so a text that fits
/// in one message is delivered untouched.
pub fn number_fragments(markdown: &str, limit: usize) -> Vec<String> {
    let single = render_fragments(markdown, limit);
    if single.len() <= 1 {
        return single;
    }

    let budget = limit.saturating_sub(POSITION_TAG_RESERVE).max(1);
    let fragments = render_fragments(markdown, budget);
    let total = fragments.len();
    fragments
        .into_iter()
        .enumerate()
        .map(|(i, body)| format!("<i>({}/{total})</i>\n{body}", i + 1))
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_untagged_message() {
        assert_eq!(
            number_fragments("**Score**: 8/10", 4000),
            vec!["<b>Score</b>: 8/10"]
        );
    }

    #[test]
    fn long_text_is_tagged_in_order() {
        let text = (1..=40)
            .map(|i| format!("- point number {i} about **composition**"))
            .collect::<Vec<_>>()
            .join("\n");
        let fragments = number_fragments(&text, 200);
        let total = fragments.len();
        assert!(total > 1);
        for (i, fragment) in fragments.iter().enumerate() {
            assert!(fragment.len() <= 200, "fragment {i} is {}", fragment.len());
            assert!(fragment.starts_with(&format!("<i>({}/{total})</i>\n", i + 1)));
        }
        assert!(fragments[0].contains("point number 1 "));
        assert!(fragments[total - 1].contains("point number 40 "));
    }

    #[test]
    fn tags_are_never_split_across_messages() {
        let text = "**bold words that keep going** ".repeat(50);
        for fragment in render_fragments(&text, 64) {
            assert_eq!(
                fragment.matches("<b>").count(),
                fragment.matches("</b>").count(),
                "unbalanced: {fragment}"
            );
        }
    }

    #[test]
    fn escaping_growth_is_split_again() {
        let text = "<".repeat(100);
        let fragments = render_fragments(&text, 40);
        assert!(fragments.iter().all(|f| f.len() <= 40));
        assert_eq!(fragments.concat(), "&lt;".repeat(100));
    }

    #[test]
    fn whitespace_only_renders_nothing() {
        assert!(render_fragments(" \n \n ", 3).is_empty());
    }
}
