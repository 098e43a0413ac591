use serde::{ Serialize, Deserialize };

/// Who authored a turn. The wire name for the assistant is `model`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ConversationTurn>,
}

/// Base64 audio exactly as the synthesis upstream returned it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineAudio {
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatResponse {
    pub response_text: String,
    pub audio: Option<InlineAudio>,
}

// --- Wire format for POST /api/chat ---

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WirePart {
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireTurn {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

impl From<WireTurn> for ConversationTurn {
    fn from(turn: WireTurn) -> Self {
        let text = turn.parts
            .into_iter()
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        ConversationTurn { role: turn.role, text }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub history: Option<Vec<WireTurn>>,
}

impl From<ChatRequestBody> for ChatRequest {
    fn from(body: ChatRequestBody) -> Self {
        ChatRequest {
            message: body.message,
            history: body.history
                .unwrap_or_default()
                .into_iter()
                .map(ConversationTurn::from)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub response: String,
    #[serde(rename = "audioData")]
    pub audio_data: Option<InlineAudio>,
}

impl From<ChatResponse> for ChatResponseBody {
    fn from(resp: ChatResponse) -> Self {
        ChatResponseBody { response: resp.response_text, audio_data: resp.audio }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wire_history_into_turns() {
        let body: ChatRequestBody = serde_json::from_value(json!({
            "message": "there",
            "history": [
                { "role": "user", "parts": [{ "text": "hi" }] },
                { "role": "model", "parts": [{ "text": "hello" }, { "text": "friend" }] },
                { "role": "assistant", "parts": [{ "text": "again" }] }
            ]
        })).unwrap();

        let req = ChatRequest::from(body);
        assert_eq!(req.message, "there");
        assert_eq!(req.history, vec![
            ConversationTurn::user("hi"),
            ConversationTurn::model("hello\nfriend"),
            ConversationTurn::model("again"),
        ]);
    }

    #[test]
    fn missing_or_null_history_is_empty() {
        let missing: ChatRequestBody = serde_json::from_value(json!({ "message": "a" })).unwrap();
        let null: ChatRequestBody = serde_json::from_value(json!({ "message": "a", "history": null })).unwrap();
        assert!(ChatRequest::from(missing).history.is_empty());
        assert!(ChatRequest::from(null).history.is_empty());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let res = serde_json::from_value::<ChatRequestBody>(json!({
            "message": "a",
            "history": [{ "role": "system", "parts": [{ "text": "x" }] }]
        }));
        assert!(res.is_err());
    }

    #[test]
    fn response_always_carries_audio_data_key() {
        let text_only = ChatResponseBody::from(ChatResponse {
            response_text: "hi".into(),
            audio: None,
        });
        assert_eq!(
            serde_json::to_value(&text_only).unwrap(),
            json!({ "response": "hi", "audioData": null })
        );

        let with_audio = ChatResponseBody::from(ChatResponse {
            response_text: "hi".into(),
            audio: Some(InlineAudio { data: "AAAA".into(), mime_type: "audio/L16;rate=24000".into() }),
        });
        assert_eq!(
            serde_json::to_value(&with_audio).unwrap(),
            json!({
                "response": "hi",
                "audioData": { "data": "AAAA", "mimeType": "audio/L16;rate=24000" }
            })
        );
    }
}
