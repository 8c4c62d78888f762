//! Message type catalogue.
//!
//! Application types are namespaced as `<Role>:<verb>`. The protocol layer
//! only cares about two things here: the reserved control types and which
//! types expect a resolve/reject, and the latter is injected through
//! [`EndpointConfig`](crate::EndpointConfig) rather than read from here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved control type: fulfils the request with the same message id.
pub const RESOLVE: &str = "resolve";
/// Reserved control type: rejects the request with the same message id.
pub const REJECT: &str = "reject";

/// Messages sent by the player (host).
pub mod player {
    pub const INIT: &str = "Player:init";
    pub const START_CREATIVE: &str = "Player:startCreative";
    pub const AD_SKIPPED: &str = "Player:adSkipped";
    pub const AD_STOPPED: &str = "Player:adStopped";
    pub const FATAL_ERROR: &str = "Player:fatalError";
    pub const RESIZE: &str = "Player:resize";
    pub const LOG: &str = "Player:log";
}

/// Messages sent by the creative (guest).
pub mod creative {
    pub const CLICK_THRU: &str = "Creative:clickThru";
    pub const FATAL_ERROR: &str = "Creative:fatalError";
    pub const GET_VIDEO_STATE: &str = "Creative:getVideoState";
    pub const REQUEST_FULL_SCREEN: &str = "Creative:requestFullScreen";
    pub const REQUEST_SKIP: &str = "Creative:requestSkip";
    pub const REQUEST_STOP: &str = "Creative:requestStop";
    pub const REQUEST_PAUSE: &str = "Creative:requestPause";
    pub const REQUEST_PLAY: &str = "Creative:requestPlay";
    pub const REQUEST_RESIZE: &str = "Creative:requestResize";
    pub const REQUEST_VOLUME: &str = "Creative:requestVolume";
    pub const REPORT_TRACKING: &str = "Creative:reportTracking";
    pub const REQUEST_CHANGE_AD_DURATION: &str = "Creative:requestChangeAdDuration";
    pub const LOG: &str = "Creative:log";
}

/// Video element events forwarded by the player.
pub mod media {
    pub const DURATION_CHANGE: &str = "Media:durationchange";
    pub const ENDED: &str = "Media:ended";
    pub const ERROR: &str = "Media:error";
    pub const PAUSE: &str = "Media:pause";
    pub const PLAY: &str = "Media:play";
    pub const PLAYING: &str = "Media:playing";
    pub const SEEKED: &str = "Media:seeked";
    pub const SEEKING: &str = "Media:seeking";
    pub const TIME_UPDATE: &str = "Media:timeupdate";
    pub const VOLUME_CHANGE: &str = "Media:volumechange";
}

/// VAST tracking events.
pub mod tracking {
    pub const CLICK_THROUGH: &str = "Tracking:clickThrough";
    pub const CLICK_TRACKING: &str = "Tracking:clickTracking";
    pub const CLOSE_LINEAR: &str = "Tracking:closeLinear";
    pub const COLLAPSE: &str = "Tracking:collapse";
    pub const COMPLETE: &str = "Tracking:complete";
    pub const CREATIVE_VIEW: &str = "Tracking:creativeView";
    pub const CUSTOM_CLICK: &str = "Tracking:customClick";
    pub const EXIT_FULL_SCREEN: &str = "Tracking:exitFullscreen";
    pub const EXPAND: &str = "Tracking:expand";
    pub const FIRST_QUARTILE: &str = "Tracking:firstQuartile";
    pub const FULL_SCREEN: &str = "Tracking:fullscreen";
    pub const IMPRESSION: &str = "Tracking:impression";
    pub const LOADED: &str = "Tracking:loaded";
    pub const MIDPOINT: &str = "Tracking:midpoint";
    pub const MUTE: &str = "Tracking:mute";
    pub const OTHER_AD_INTERACTION: &str = "Tracking:otherAdInteraction";
    pub const PAUSE: &str = "Tracking:pause";
    pub const PLAYER_COLLAPSE: &str = "Tracking:playerCollapse";
    pub const PLAYER_EXPAND: &str = "Tracking:playerExpand";
    pub const PROGRESS: &str = "Tracking:progress";
    pub const RESUME: &str = "Tracking:resume";
    pub const REWIND: &str = "Tracking:rewind";
    pub const SKIP: &str = "Tracking:skip";
    pub const START: &str = "Tracking:start";
    pub const THIRD_QUARTILE: &str = "Tracking:thirdQuartile";
    pub const UNMUTE: &str = "Tracking:unmute";
}

/// Types that expect a resolve or reject from the receiver.
///
/// Everything else is informational.
#[must_use]
pub fn default_response_required() -> HashSet<String> {
    [
        creative::GET_VIDEO_STATE,
        creative::CLICK_THRU,
        creative::REQUEST_SKIP,
        creative::REQUEST_STOP,
        creative::REQUEST_PAUSE,
        creative::REQUEST_PLAY,
        creative::REQUEST_FULL_SCREEN,
        creative::REQUEST_VOLUME,
        creative::REQUEST_RESIZE,
        creative::REQUEST_CHANGE_AD_DURATION,
        creative::REPORT_TRACKING,
        player::INIT,
        player::START_CREATIVE,
        player::AD_SKIPPED,
        player::AD_STOPPED,
        player::FATAL_ERROR,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Split `"<Role>:<verb>"` into its parts.
#[must_use]
pub fn split_type(message_type: &str) -> Option<(&str, &str)> {
    let (role, verb) = message_type.split_once(':')?;
    if role.is_empty() || verb.is_empty() {
        return None;
    }
    Some((role, verb))
}

/// Conventional body of a `reject` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error_code: u32,
    #[serde(default)]
    pub message: String,
}

impl ErrorPayload {
    /// Create an error payload.
    #[must_use]
    pub fn new(error_code: u32, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    /// Read an error payload back out of a rejection value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Convert into the envelope `args` value.
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_split_type() {
        assert_eq!(split_type(player::INIT), Some(("Player", "init")));
        assert_eq!(split_type("Tracking:start"), Some(("Tracking", "start")));
        assert_eq!(split_type(RESOLVE), None);
        assert_eq!(split_type(":verb"), None);
        assert_eq!(split_type("Role:"), None);
    }

    #[test]
    fn test_default_response_required() {
        let set = default_response_required();
        assert!(set.contains(player::INIT));
        assert!(set.contains(creative::REQUEST_PLAY));
        assert!(!set.contains(media::TIME_UPDATE));
        assert!(!set.contains(tracking::IMPRESSION));
        assert!(!set.contains(RESOLVE));
    }

    #[test]
    fn test_error_payload_value() {
        let value = ErrorPayload::new(1201, "skip not allowed").into_value();
        assert_eq!(value, json!({"errorCode": 1201, "message": "skip not allowed"}));
        assert_eq!(
            ErrorPayload::from_value(&value),
            Some(ErrorPayload::new(1201, "skip not allowed"))
        );
        assert_eq!(ErrorPayload::from_value(&Value::Null), None);
    }
}
