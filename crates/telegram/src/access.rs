use crate::config::TelegramConfig;

/// Determine if a message from this sender should be processed.
///
/// An empty allowlist admits everyone. Entries match the numeric user id or
/// the username (with or without a leading `@`), case-insensitively, and may
/// use `*` as a wildcard.
pub fn check_access(
    config: &TelegramConfig,
    peer_id: Option<&str>,
    username: Option<&str>,
) -> Result<(), AccessDenied> {
    if config.allowlist.is_empty() {
        return Ok(());
    }
    let Some(peer_id) = peer_id else {
        return Err(AccessDenied::UnknownSender);
    };
    if is_allowed(peer_id, &config.allowlist)
        || username.is_some_and(|u| is_allowed(u, &config.allowlist))
    {
        Ok(())
    } else {
        Err(AccessDenied::NotOnAllowlist)
    }
}

fn is_allowed(peer: &str, allowlist: &[String]) -> bool {
    let peer = peer.trim_start_matches('@').to_lowercase();
    allowlist.iter().any(|entry| {
        let pattern = entry.trim().trim_start_matches('@').to_lowercase();
        if pattern.contains('*') {
            glob_match(&pattern, &peer)
        } else {
            pattern == peer
        }
    })
}

/// `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(idx) => {
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            },
            None => return false,
        }
    }
    parts.last().is_none_or(|last| last.is_empty()) || pos == text.len()
}

/// Reason an inbound message was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    UnknownSender,
    NotOnAllowlist,
}

impl std::fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSender => write!(f, "message has no sender"),
            Self::NotOnAllowlist => write!(f, "user not on allowlist"),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn cfg(allowlist: &[&str]) -> TelegramConfig {
        TelegramConfig {
            allowlist: allowlist.iter().map(|s| (*s).to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_allowlist_is_open() {
        assert!(check_access(&cfg(&[]), Some("1"), None).is_ok());
        assert!(check_access(&cfg(&[]), None, None).is_ok());
    }

    #[rstest]
    #[case(&["1001"], Some("1001"), None, true)]
    #[case(&["@Alice"], Some("1001"), Some("alice"), true)]
    #[case(&["alice"], Some("1001"), Some("@ALICE"), true)]
    #[case(&["design_*"], Some("7"), Some("design_team"), true)]
    #[case(&["*_bot"], Some("7"), Some("bob"), false)]
    #[case(&["alice"], Some("1001"), Some("bob"), false)]
    #[case(&["alice"], Some("1001"), None, false)]
    fn allowlist_matches_id_or_username(
        #[case] allowlist: &[&str],
        #[case] peer_id: Option<&str>,
        #[case] username: Option<&str>,
        #[case] allowed: bool,
    ) {
        assert_eq!(
            check_access(&cfg(allowlist), peer_id, username).is_ok(),
            allowed
        );
    }

    #[test]
    fn anonymous_sender_is_rejected_when_restricted() {
        assert_eq!(
            check_access(&cfg(&["alice"]), None, None),
            Err(AccessDenied::UnknownSender)
        );
    }

    #[rstest]
    #[case("a*c", "abc", true)]
    #[case("a*c", "abd", false)]
    #[case("*", "anything", true)]
    #[case("ab*", "xab", false)]
    fn glob(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(glob_match(pattern, text), expected);
    }
}
