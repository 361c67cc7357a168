//! Receiver registry: builds a voting receiver from config.

use anyhow::{Result, anyhow};
use vf_core::config::ReceiverConfig;
use vf_core::sink::ErrorSink;

use crate::VotingReceiver;
use crate::simulated::{Profile, SimulatedReceiver};
use crate::tiktok::TikTokReceiver;
use crate::youtube::YouTubeReceiver;

/// Create a receiver based on the `platform` field in the config.
///
/// Each receiver reports through its own clone of `sink`.
pub fn create_receiver(config: &ReceiverConfig, sink: ErrorSink) -> Result<Box<dyn VotingReceiver>> {
    let platform = config.platform.to_lowercase();

    Ok(match platform.as_str() {
        "tiktok" => Box::new(TikTokReceiver::new(config, sink)?),
        "youtube" => Box::new(YouTubeReceiver::new(config, sink)?),
        "tiktok_test" => Box::new(SimulatedReceiver::from_receiver(Profile::TikTok, config)),
        "youtube_test" => Box::new(SimulatedReceiver::from_receiver(Profile::YouTube, config)),
        other => return Err(anyhow!("Unknown voting platform: {other}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_platform() {
        let youtube = ReceiverConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            ..ReceiverConfig::for_platform("YouTube")
        };
        let cases = [
            (ReceiverConfig::for_platform("tiktok"), "tiktok"),
            (youtube, "youtube"),
            (ReceiverConfig::for_platform("tiktok_test"), "tiktok_test"),
            (ReceiverConfig::for_platform("youtube_test"), "youtube_test"),
        ];
        for (cfg, name) in cases {
            let rx = create_receiver(&cfg, ErrorSink::detached()).unwrap();
            assert_eq!(rx.name(), name);
        }
    }

    #[test]
    fn rejects_unknown_and_misconfigured() {
        let err = create_receiver(&ReceiverConfig::for_platform("twitch"), ErrorSink::detached())
            .err()
            .unwrap();
        assert!(err.to_string().contains("twitch"));

        // youtube without credentials
        assert!(create_receiver(&ReceiverConfig::for_platform("youtube"), ErrorSink::detached()).is_err());
    }
}
