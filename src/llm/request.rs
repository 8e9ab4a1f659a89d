//! Wire types for the hosted completion endpoint.

use serde::{Deserialize, Serialize};

use crate::models::ImageData;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Body POSTed to the endpoint. Unset `model`, `max_tokens` and `temperature`
/// are filled from settings by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn text(system: &str, prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            system: Some(system.to_string()),
            messages: vec![Message {
                role: Role::User,
                content: MessageContent::Text(prompt.into()),
            }],
            max_tokens: None,
            temperature: None,
        }
    }

    /// Image block first, then the text prompt. Without an image this is a
    /// plain block-form text request.
    pub fn vision(system: &str, prompt: impl Into<String>, image: Option<&ImageData>) -> Self {
        let mut blocks = Vec::with_capacity(2);
        if let Some(image) = image {
            blocks.push(ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64".to_string(),
                    media_type: image.media_type.clone(),
                    data: image.data.clone(),
                },
            });
        }
        blocks.push(ContentBlock::Text {
            text: prompt.into(),
        });

        Self {
            model: None,
            system: Some(system.to_string()),
            messages: vec![Message {
                role: Role::User,
                content: MessageContent::Blocks(blocks),
            }],
            max_tokens: None,
            temperature: None,
        }
    }

    /// Text of the first user message, whatever its content form.
    pub fn prompt_text(&self) -> String {
        let Some(message) = self.messages.first() else {
            return String::new();
        };
        match &message.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn has_image(&self) -> bool {
        self.messages.iter().any(|message| match &message.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .any(|block| matches!(block, ContentBlock::Image { .. })),
            MessageContent::Text(_) => false,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBlock {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
}

impl LlmResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| block.text.as_deref())
    }
}
