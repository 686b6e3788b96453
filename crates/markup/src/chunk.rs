/// Split text into fragments of at most `limit` bytes.
///
/// Each cut prefers the last newline inside the window, then the last space,
/// and falls back to a hard cut at the window end. Newlines and spaces at the
/// start of the remainder are dropped after every cut, so separators at cut
/// points do not survive. Cuts never land inside a UTF-8 sequence; a window
/// smaller than the first character still emits that character whole.
pub fn to_safe_fragments(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut fragments = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= limit {
            fragments.push(remaining.to_string());
            break;
        }

        let window = match remaining.floor_char_boundary(limit) {
            0 => remaining
                .chars()
                .next()
                .map_or(remaining.len(), char::len_utf8),
            end => end,
        };

        let slice = &remaining[..window];
        let cut = slice
            .rfind('\n')
            .filter(|&pos| pos > 0)
            .or_else(|| slice.rfind(' ').filter(|&pos| pos > 0))
            .unwrap_or(window);

        fragments.push(remaining[..cut].to_string());
        remaining = remaining[cut..].trim_start_matches(['\n', ' ']);
    }

    fragments
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("", 10)]
    #[case("short", 10)]
    #[case("exactly10!", 10)]
    fn text_within_limit_is_one_fragment(#[case] text: &str, #[case] limit: usize) {
        assert_eq!(to_safe_fragments(text, limit), vec![text.to_string()]);
    }

    #[test]
    fn no_whitespace_hard_cuts_into_three() {
        let text = "x".repeat(30);
        let fragments = to_safe_fragments(&text, 10);
        assert_eq!(fragments.len(), 3);
        assert!(fragments.iter().all(|f| f.len() == 10));
        assert_eq!(fragments.concat(), text);
    }

    #[test]
    fn prefers_newline_over_space() {
        let fragments = to_safe_fragments("alpha beta\ngamma delta", 15);
        assert_eq!(fragments, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn falls_back_to_space() {
        let fragments = to_safe_fragments("one two three four", 9);
        assert_eq!(fragments, vec!["one two", "three", "four"]);
    }

    #[test]
    fn trims_separator_runs_after_cut() {
        let fragments = to_safe_fragments("first\n\n\n  second", 8);
        assert_eq!(fragments, vec!["first\n\n", "second"]);
    }

    #[test]
    fn leading_separator_does_not_emit_empty_fragment() {
        let fragments = to_safe_fragments("\nabcdefghij", 5);
        assert!(fragments.iter().all(|f| !f.is_empty()));
        assert!(fragments.iter().all(|f| f.len() <= 5));
    }

    #[test]
    fn never_splits_multibyte_characters() {
        let text = "привет мир ".repeat(20);
        for limit in [1, 3, 7, 16, 50] {
            for fragment in to_safe_fragments(&text, limit) {
                assert!(!fragment.is_empty());
                // A window narrower than one character still yields that character.
                assert!(fragment.len() <= limit.max(2), "{fragment:?} over {limit}");
            }
        }
    }

    #[test]
    fn every_fragment_respects_limit() {
        let text = "lorem ipsum dolor sit amet\n".repeat(300);
        let fragments = to_safe_fragments(&text, 100);
        assert!(fragments.len() > 1);
        assert!(fragments.iter().all(|f| f.len() <= 100));
        let rejoined: String = fragments.join(" ");
        assert_eq!(
            rejoined.split_whitespace().count(),
            text.split_whitespace().count()
        );
    }

    #[test]
    fn zero_limit_yields_nothing() {
        assert!(to_safe_fragments("abc", 0).is_empty());
    }
}
