//! Murf API message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Streaming: client → server
// =============================================================================

/// First message on a stream.
#[derive(Debug, Serialize)]
pub struct VoiceConfigMessage<'a> {
    pub voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig<'a> {
    pub voice_id: &'a str,
    pub style: &'a str,
    pub rate: i32,
    pub pitch: i32,
    pub variation: i32,
}

impl<'a> VoiceConfigMessage<'a> {
    /// Voice configuration with neutral rate, pitch and variation.
    pub fn neutral(voice_id: &'a str, style: &'a str) -> Self {
        Self {
            voice_config: VoiceConfig {
                voice_id,
                style,
                rate: 0,
                pitch: 0,
                variation: 1,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TextMessage<'a> {
    pub text: &'a str,
    pub end: bool,
}

// =============================================================================
// Streaming: server → client
// =============================================================================

/// A server message. Any combination of fields may be present.
#[derive(Debug, Default, Deserialize)]
pub struct ServerMessage {
    /// Base64 audio chunk
    #[serde(default)]
    pub audio: Option<String>,

    #[serde(default, rename = "final")]
    pub is_final: bool,

    /// String or structured error
    #[serde(default)]
    pub error: Option<Value>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ServerMessage {
    /// Human-readable error carried by the message, if any.
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        let text = match error {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
            other => other.to_string(),
        };
        Some(match &self.message {
            Some(m) if !m.is_empty() && m != &text => format!("{text}: {m}"),
            _ => text,
        })
    }
}

// =============================================================================
// REST
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub format: &'a str,
    pub encode_as_base64: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_customization: Option<SpeechCustomization<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SpeechCustomization<'a> {
    pub style: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default, alias = "encoded_audio", rename = "encodedAudio")]
    pub encoded_audio: Option<String>,

    #[serde(default, alias = "audio_file", rename = "audioFile")]
    pub audio_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_voice_config_shape() {
        let msg = VoiceConfigMessage::neutral("en-US-natalie", "Conversational");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"voice_config": {
                "voiceId": "en-US-natalie",
                "style": "Conversational",
                "rate": 0,
                "pitch": 0,
                "variation": 1
            }})
        );
    }

    #[test]
    fn test_server_message_parsing() {
        let msg: ServerMessage = serde_json::from_str(r#"{"audio":"AAEC","final":true}"#).unwrap();
        assert_eq!(msg.audio.as_deref(), Some("AAEC"));
        assert!(msg.is_final);
        assert!(msg.error_message().is_none());

        let msg: ServerMessage =
            serde_json::from_str(r#"{"error":{"message":"invalid voice"}}"#).unwrap();
        assert_eq!(msg.error_message().as_deref(), Some("invalid voice"));

        let msg: ServerMessage = serde_json::from_str(r#"{"error":"quota"}"#).unwrap();
        assert_eq!(msg.error_message().as_deref(), Some("quota"));
    }

    #[test]
    fn test_generate_request_omits_empty_style() {
        let req = GenerateRequest {
            text: "hi",
            voice_id: "v1",
            format: "wav",
            encode_as_base64: true,
            speech_customization: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["encodeAsBase64"], true);
        assert!(value.get("speechCustomization").is_none());
    }

    #[test]
    fn test_generate_response_aliases() {
        let resp: GenerateResponse = serde_json::from_str(r#"{"encoded_audio":"AAEC"}"#).unwrap();
        assert_eq!(resp.encoded_audio.as_deref(), Some("AAEC"));
        let resp: GenerateResponse = serde_json::from_str(r#"{"audioFile":"http://x/a.wav"}"#).unwrap();
        assert_eq!(resp.audio_file.as_deref(), Some("http://x/a.wav"));
    }
}
