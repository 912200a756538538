//! Common types for LLM chat completions.

use serde::{Deserialize, Deserializer, Serialize};

/// A chat completion request (OpenAI format).
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_completion_tokens: u32,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    #[default]
    Assistant,
}

/// A chat completion response.
///
/// Every field is optional on the wire so that a structurally odd reply
/// still parses and can be classified instead of failing deserialization.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message of a completion choice.
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    /// `None` when the field is missing, `Some(None)` when it is `null`.
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Option<String>>,
    #[serde(default)]
    pub refusal: Option<String>,
}

/// Token usage statistics. Only logged, so missing counts read as zero.
#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt_tokens: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completion_tokens: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tokens: u32,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                Message::system("You are an expert Developer."),
                Message::user("Review this diff"),
            ],
            temperature: 0.5,
            max_completion_tokens: 512,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "You are an expert Developer.");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Review this diff");
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["max_completion_tokens"], 512);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "id": "chatcmpl-123",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "Looks good to me.",
                        "refusal": null
                    },
                    "finish_reason": "stop"
                }
            ],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15
            }
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id.as_deref(), Some("chatcmpl-123"));
        assert_eq!(response.choices.len(), 1);

        let choice = &response.choices[0];
        let message = choice.message.as_ref().unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, Some(Some("Looks good to me.".to_string())));
        assert!(message.refusal.is_none());
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));

        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn test_null_content_is_distinct_from_missing_content() {
        let null_content: ResponseMessage =
            serde_json::from_str(r#"{"role": "assistant", "content": null}"#).unwrap();
        assert_eq!(null_content.content, Some(None));

        let missing_content: ResponseMessage =
            serde_json::from_str(r#"{"role": "assistant"}"#).unwrap();
        assert_eq!(missing_content.content, None);
    }

    #[test]
    fn test_chat_response_without_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"id": "chatcmpl-456"}"#).unwrap();
        assert!(response.choices.is_empty());
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_null_choices_and_message_parse() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"id": "x", "choices": null}"#).unwrap();
        assert!(response.choices.is_empty());

        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": null}]}"#).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert!(response.choices[0].message.is_none());
    }

    #[test]
    fn test_logging_only_fields_are_lenient() {
        let response: ChatResponse = serde_json::from_str(
            r#"{
                "id": null,
                "choices": [{"index": null, "message": {"role": null, "content": "hi"}}],
                "usage": {"prompt_tokens": 1}
            }"#,
        )
        .unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.choices[0].index, 0);

        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 1);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn test_refusal_deserialization() {
        let message: ResponseMessage = serde_json::from_str(
            r#"{"role": "assistant", "content": null, "refusal": "I can't help with that."}"#,
        )
        .unwrap();
        assert_eq!(message.refusal.as_deref(), Some("I can't help with that."));
    }

    #[test]
    fn test_message_roles() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"assistant\"").unwrap(),
            Role::Assistant
        );
    }
}
