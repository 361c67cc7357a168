//! The normalized vote event every receiver produces.
//!
//! A vote is a single ASCII digit `1`..=`8` taken from one chat message. The
//! grammar check lives here so that no receiver can construct a
//! [`VoteEvent`] from text that fails it.

use serde::Serialize;

/// Lowest accepted vote digit.
pub const MIN_VOTE: u8 = 1;
/// Highest accepted vote digit.
pub const MAX_VOTE: u8 = 8;

/// Check `text` against the single-digit vote grammar.
///
/// Surrounding whitespace is ignored. Returns the digit value when the
/// remaining text is exactly one character in `1`..=`8`.
pub fn parse_vote(text: &str) -> Option<u8> {
    let mut chars = text.trim().chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let digit = c.to_digit(10)? as u8;
    (MIN_VOTE..=MAX_VOTE).contains(&digit).then_some(digit)
}

/// One vote cast by one attributed user.
///
/// Immutable once built. `username` is always lower case and `message` is
/// always a single digit in `1`..=`8`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VoteEvent {
    username: String,
    client_id: String,
    message: String,
}

impl VoteEvent {
    /// Build a vote if `message` passes the grammar check.
    ///
    /// `username` is case-folded to lower case. Returns `None` for anything
    /// that is not a vote; that is ordinary chat, not an error.
    pub fn try_new(username: &str, client_id: &str, message: &str) -> Option<Self> {
        let digit = parse_vote(message)?;
        Some(Self {
            username: username.to_lowercase(),
            client_id: client_id.to_string(),
            message: digit.to_string(),
        })
    }

    /// Attribution name, lower case.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Platform-specific stable identifier of the voter.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The vote digit as text (`"1"`..=`"8"`).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The vote digit as a number.
    pub fn digit(&self) -> u8 {
        // message is always one ASCII digit
        self.message.as_bytes()[0] - b'0'
    }
}

impl std::fmt::Display for VoteEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) -> {}", self.username, self.client_id, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_accepts_one_through_eight() {
        for d in 1..=8u8 {
            assert_eq!(parse_vote(&d.to_string()), Some(d));
        }
        assert_eq!(parse_vote("  5\t"), Some(5));
    }

    #[test]
    fn grammar_rejects_everything_else() {
        for text in ["", "   ", "0", "9", "12", "a", "1 2", "١", "x1", "+1", "1."] {
            assert_eq!(parse_vote(text), None, "{text:?} should not be a vote");
        }
    }

    #[test]
    fn username_is_lowercased() {
        let vote = VoteEvent::try_new("StreamerFan99", "UCabc", " 7 ").unwrap();
        assert_eq!(vote.username(), "streamerfan99");
        assert_eq!(vote.client_id(), "UCabc");
        assert_eq!(vote.message(), "7");
        assert_eq!(vote.digit(), 7);
    }

    #[test]
    fn invalid_message_builds_nothing() {
        assert!(VoteEvent::try_new("user", "id", "9").is_none());
        assert!(VoteEvent::try_new("user", "id", "gg").is_none());
    }

    #[test]
    fn serializes_flat() {
        let vote = VoteEvent::try_new("UserX", "UserX", "3").unwrap();
        let json = serde_json::to_string(&vote).unwrap();
        assert_eq!(json, r#"{"username":"userx","client_id":"UserX","message":"3"}"#);
    }
}
