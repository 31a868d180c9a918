//! Live session wire protocol
//!
//! JSON message shapes for the bidirectional `BidiGenerateContent` stream:
//! builders for outbound frames and the parser turning inbound frames into
//! [`ServerEvent`]s. The parser is lenient — unknown messages produce no
//! events rather than errors.

use serde::{Deserialize, Serialize};

use crate::audio::codec;
use crate::session::events::{ServerEvent, ToolCallRequest};

/// Upstream audio MIME type (16kHz mono PCM16)
const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

// -- Outbound builders --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupMessage<'a> {
    setup: Setup<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup<'a> {
    model: String,
    generation_config: GenerationConfig,
    system_instruction: ContentOut<'a>,
    tools: &'a serde_json::Value,
    input_audio_transcription: serde_json::Value,
    output_audio_transcription: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Serialize)]
struct ContentOut<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInputMessage<'a> {
    realtime_input: RealtimeInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInput<'a> {
    audio: AudioBlob<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioBlob<'a> {
    data: String,
    mime_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolResponseMessage<'a> {
    tool_response: ToolResponse<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolResponse<'a> {
    function_responses: Vec<FunctionResponse<'a>>,
}

#[derive(Serialize)]
struct FunctionResponse<'a> {
    id: &'a str,
    name: &'a str,
    response: serde_json::Value,
}

/// Build the session setup frame
#[must_use]
pub fn setup_message(
    model: &str,
    system_instruction: &str,
    tool_declarations: &serde_json::Value,
) -> String {
    let message = SetupMessage {
        setup: Setup {
            model: format!("models/{model}"),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO"],
            },
            system_instruction: ContentOut {
                parts: vec![PartOut {
                    text: system_instruction,
                }],
            },
            tools: tool_declarations,
            input_audio_transcription: serde_json::json!({}),
            output_audio_transcription: serde_json::json!({}),
        },
    };
    serde_json::to_string(&message).unwrap_or_default()
}

/// Build a realtime audio frame from raw PCM16 bytes
#[must_use]
pub fn realtime_audio_message(frame: &[u8]) -> String {
    let message = RealtimeInputMessage {
        realtime_input: RealtimeInput {
            audio: AudioBlob {
                data: codec::encode_base64(frame),
                mime_type: INPUT_AUDIO_MIME,
            },
        },
    };
    serde_json::to_string(&message).unwrap_or_default()
}

/// Build a tool response frame correlated by call id
#[must_use]
pub fn tool_response_message(id: &str, name: &str, result: &str) -> String {
    let message = ToolResponseMessage {
        tool_response: ToolResponse {
            function_responses: vec![FunctionResponse {
                id,
                name,
                response: serde_json::json!({ "result": result }),
            }],
        },
    };
    serde_json::to_string(&message).unwrap_or_default()
}

// -- Inbound parsing --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    server_content: Option<ServerContent>,
    tool_call: Option<ToolCall>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<TurnPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnPart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Deserialize)]
struct Transcription {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCall {
    #[serde(default)]
    function_calls: Vec<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

/// Parse one inbound frame into zero or more [`ServerEvent`]s.
///
/// A frame may carry several payloads (transcriptions, audio, turn flags);
/// events are emitted in processing order: transcriptions, audio,
/// interruption, tool calls, turn completion.
#[must_use]
pub fn parse_server_frame(raw: &str) -> Vec<ServerEvent> {
    let Ok(message) = serde_json::from_str::<ServerMessage>(raw) else {
        tracing::debug!(bytes = raw.len(), "ignoring unparseable frame");
        return Vec::new();
    };

    let mut events = Vec::new();

    if let Some(content) = message.server_content {
        if let Some(text) = content.input_transcription.and_then(|t| t.text) {
            if !text.is_empty() {
                events.push(ServerEvent::InputTranscription(text));
            }
        }
        if let Some(text) = content.output_transcription.and_then(|t| t.text) {
            if !text.is_empty() {
                events.push(ServerEvent::OutputTranscription(text));
            }
        }
        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(inline) = part.inline_data {
                    let bytes = codec::decode_base64(&inline.data);
                    if !bytes.is_empty() {
                        events.push(ServerEvent::AudioDelta(bytes));
                    }
                }
            }
        }
        if content.interrupted {
            events.push(ServerEvent::Interrupted);
        }
        if content.turn_complete {
            events.push(ServerEvent::TurnComplete);
        }
    }

    if let Some(tool_call) = message.tool_call {
        let calls: Vec<ToolCallRequest> = tool_call
            .function_calls
            .into_iter()
            .map(|c| ToolCallRequest {
                id: c.id,
                name: c.name,
                args: c.args,
            })
            .collect();
        if !calls.is_empty() {
            events.push(ServerEvent::ToolCall(calls));
        }
    }

    events
}
