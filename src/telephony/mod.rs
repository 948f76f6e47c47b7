//! Twilio Media Streams wire protocol.
//!
//! JSON messages exchanged over the `/media-stream` WebSocket. Twilio opens
//! the socket when a call connects, sends `connected` then `start`, streams
//! `media` frames of base64 G.711 u-law audio, and ends with `stop`. The
//! gateway speaks back only `media` frames addressed by stream SID.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Messages received from Twilio over the media stream socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioMessage {
    /// First message after the WebSocket handshake
    Connected {
        /// Protocol name ("Call")
        #[serde(default)]
        protocol: Option<String>,
    },

    /// Call metadata; arrives once, before any media
    Start {
        /// Stream SID, also repeated inside `start`
        #[serde(rename = "streamSid")]
        stream_sid: String,
        /// Stream metadata
        start: StreamStart,
    },

    /// One frame of caller audio
    Media {
        /// Audio frame
        media: MediaPayload,
    },

    /// The call ended; no media follows
    Stop {
        /// Stream SID
        #[serde(rename = "streamSid")]
        stream_sid: String,
        /// Stop metadata
        #[serde(default)]
        stop: Option<StreamStop>,
    },

    /// Mark acknowledgement (unused; the gateway sends no marks)
    Mark {},

    /// DTMF keypress (unused)
    Dtmf {},
}

impl TwilioMessage {
    /// Decode one text frame from the media stream socket.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Metadata inside the `start` message.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamStart {
    /// Twilio account SID
    #[serde(rename = "accountSid", default)]
    pub account_sid: Option<String>,
    /// Call SID, the session key for the whole call
    #[serde(rename = "callSid")]
    pub call_sid: String,
    /// Stream SID, echoed on every outbound media frame
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    /// Custom parameters declared in the TwiML `<Stream>` element
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
    /// Negotiated media format
    #[serde(rename = "mediaFormat", default)]
    pub media_format: Option<MediaFormat>,
}

impl StreamStart {
    /// Caller phone number, when the TwiML passed it through as the
    /// `from` custom parameter.
    pub fn caller(&self) -> Option<&str> {
        self.custom_parameters.get("from").map(String::as_str)
    }
}

/// Negotiated audio format in the `start` message.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFormat {
    /// Encoding name ("audio/x-mulaw")
    #[serde(default)]
    pub encoding: Option<String>,
    /// Sample rate in Hz
    #[serde(rename = "sampleRate", default)]
    pub sample_rate: Option<u32>,
}

/// One inbound audio frame.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    /// Which direction the audio came from ("inbound")
    #[serde(default)]
    pub track: Option<String>,
    /// Base64-encoded G.711 u-law audio
    pub payload: String,
}

/// Metadata inside the `stop` message.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamStop {
    /// Call SID
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
}

/// Outbound audio frame sent back to Twilio.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMediaFrame {
    /// Always "media"
    pub event: &'static str,
    /// Stream SID from the `start` message
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    /// Frame content
    pub media: OutboundMediaPayload,
}

/// Payload of an outbound media frame.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMediaPayload {
    /// Base64-encoded G.711 u-law audio
    pub payload: String,
}

impl OutboundMediaFrame {
    /// Build one outbound audio frame for the given stream.
    pub fn new(stream_sid: &str, payload: String) -> Self {
        Self {
            event: "media",
            stream_sid: stream_sid.to_string(),
            media: OutboundMediaPayload { payload },
        }
    }

    /// Serialize to the wire text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_message() {
        let raw = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "streamSid": "MZ0123456789abcdef0123456789abcdef",
            "start": {
                "accountSid": "AC0123456789abcdef0123456789abcdef",
                "callSid": "CA0123456789abcdef0123456789abcdef",
                "streamSid": "MZ0123456789abcdef0123456789abcdef",
                "tracks": ["inbound"],
                "customParameters": {"from": "+15551234567"},
                "mediaFormat": {
                    "encoding": "audio/x-mulaw",
                    "sampleRate": 8000,
                    "channels": 1
                }
            }
        }"#;

        match TwilioMessage::parse(raw).unwrap() {
            TwilioMessage::Start { stream_sid, start } => {
                assert_eq!(stream_sid, "MZ0123456789abcdef0123456789abcdef");
                assert_eq!(start.call_sid, "CA0123456789abcdef0123456789abcdef");
                assert_eq!(start.caller(), Some("+15551234567"));
                assert_eq!(start.media_format.unwrap().sample_rate, Some(8000));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_start_without_custom_parameters() {
        let raw = r#"{
            "event": "start",
            "streamSid": "MZ1",
            "start": {"callSid": "CA1", "streamSid": "MZ1"}
        }"#;
        match TwilioMessage::parse(raw).unwrap() {
            TwilioMessage::Start { start, .. } => {
                assert!(start.caller().is_none());
                assert!(start.account_sid.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_media_message() {
        let raw = r#"{
            "event": "media",
            "sequenceNumber": "4",
            "streamSid": "MZ1",
            "media": {
                "track": "inbound",
                "chunk": "2",
                "timestamp": "5",
                "payload": "bXVsYXc="
            }
        }"#;
        match TwilioMessage::parse(raw).unwrap() {
            TwilioMessage::Media { media } => {
                assert_eq!(media.payload, "bXVsYXc=");
                assert_eq!(media.track.as_deref(), Some("inbound"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_stop_and_connected() {
        let stop = r#"{"event":"stop","streamSid":"MZ1","stop":{"accountSid":"AC1","callSid":"CA1"}}"#;
        assert!(matches!(
            TwilioMessage::parse(stop).unwrap(),
            TwilioMessage::Stop { .. }
        ));

        let connected = r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#;
        assert!(matches!(
            TwilioMessage::parse(connected).unwrap(),
            TwilioMessage::Connected { .. }
        ));
    }

    #[test]
    fn test_outbound_frame_shape() {
        let frame = OutboundMediaFrame::new("MZ1", "AAAA".to_string());
        let json: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "media");
        assert_eq!(json["streamSid"], "MZ1");
        assert_eq!(json["media"]["payload"], "AAAA");
    }
}
