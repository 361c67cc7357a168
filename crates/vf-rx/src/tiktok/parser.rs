//! TikFinity frame parser.
//!
//! TikFinity pushes one JSON object per text frame:
//!
//! ```json
//! {"event":"chat","data":{"comment":"3","uniqueId":"some_handle","nickname":"Some Name"}}
//! ```
//!
//! Only `chat` events can carry votes. Other events (gifts, likes, follows)
//! are ignored without looking at their `data`.
//!
//! The two rejection paths are kept apart: a frame that is not valid JSON, or
//! a chat event whose `data` has the wrong shape, is a payload error (`Err`);
//! a well-formed frame that is not a vote is `Ok(None)`.

use serde::Deserialize;
use tracing::{debug, info};
use vf_core::error::VoteError;
use vf_core::types::VoteEvent;

/// The event tag carrying chat messages.
pub const CHAT_EVENT: &str = "chat";

#[derive(Debug, Deserialize)]
struct Frame {
    event: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatData {
    comment: Option<String>,
    unique_id: Option<String>,
    nickname: Option<String>,
}

/// Parse one TikFinity text frame.
///
/// `Username` on the resulting vote is the lowercased `uniqueId` (the TikTok
/// handle); `nickname` is only logged.
pub fn parse_frame(text: &str) -> Result<Option<VoteEvent>, VoteError> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| VoteError::Parse(format!("frame: {e}")))?;

    if frame.event.as_deref() != Some(CHAT_EVENT) {
        return Ok(None);
    }

    let data: ChatData = serde_json::from_value(frame.data)
        .map_err(|e| VoteError::Parse(format!("chat data: {e}")))?;

    let (Some(comment), Some(unique_id), Some(nickname)) = (
        non_empty(data.comment),
        non_empty(data.unique_id),
        non_empty(data.nickname),
    ) else {
        debug!("chat event missing comment, uniqueId or nickname");
        return Ok(None);
    };

    match VoteEvent::try_new(&unique_id, &unique_id, &comment) {
        Some(vote) => {
            info!("vote from {nickname} ({unique_id}): {}", vote.message());
            Ok(Some(vote))
        }
        None => {
            debug!("not a vote from {nickname}: {:?}", comment.trim());
            Ok(None)
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(comment: &str, unique_id: &str, nickname: &str) -> String {
        serde_json::json!({
            "event": "chat",
            "data": { "comment": comment, "uniqueId": unique_id, "nickname": nickname }
        })
        .to_string()
    }

    #[test]
    fn literal_chat_frame() {
        let frame = r#"{"event":"chat","data":{"comment":" 3 ","uniqueId":"UserX","nickname":"Nick"}}"#;
        let vote = parse_frame(frame).unwrap().unwrap();
        assert_eq!(vote.username(), "userx");
        assert_eq!(vote.client_id(), "UserX");
        assert_eq!(vote.message(), "3");
    }

    #[test]
    fn username_comes_from_unique_id_not_nickname() {
        let vote = parse_frame(&chat("8", "StreamerFan99", "Totally Different")).unwrap().unwrap();
        assert_eq!(vote.username(), "streamerfan99");
        assert_eq!(vote.client_id(), "StreamerFan99");
    }

    #[test]
    fn non_votes_are_silently_ignored() {
        for comment in ["", "   ", "0", "9", "12", "hello", "3!"] {
            assert!(parse_frame(&chat(comment, "u", "n")).unwrap().is_none(), "{comment:?}");
        }
    }

    #[test]
    fn missing_or_empty_identity_is_ignored() {
        assert!(parse_frame(&chat("1", "", "n")).unwrap().is_none());
        assert!(parse_frame(&chat("1", "u", "")).unwrap().is_none());
        let no_nick = r#"{"event":"chat","data":{"comment":"1","uniqueId":"u"}}"#;
        assert!(parse_frame(no_nick).unwrap().is_none());
    }

    #[test]
    fn other_events_are_ignored() {
        let gift = r#"{"event":"gift","data":{"giftId":5,"comment":12}}"#;
        assert!(parse_frame(gift).unwrap().is_none());
        assert!(parse_frame(r#"{"data":{"comment":"1"}}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_frames_are_payload_errors() {
        assert!(matches!(parse_frame("not json"), Err(VoteError::Parse(_))));
        assert!(matches!(parse_frame(r#"{"event":"chat","data":"oops"}"#), Err(VoteError::Parse(_))));
        let bad_type = r#"{"event":"chat","data":{"comment":3,"uniqueId":"u","nickname":"n"}}"#;
        assert!(matches!(parse_frame(bad_type), Err(VoteError::Parse(_))));
    }
}
