use crate::models::ollama::ChatMessage;
use crate::models::openai::{ContentPart, ImageUrl, Message, MessageContent, Role};

/// Wrap a base64 payload as a data URI.
///
/// The MIME type is always `image/png`, whatever the real encoding is.
pub fn image_data_uri(image_b64: &str) -> String {
    format!("data:image/png;base64,{}", image_b64)
}

fn image_part(image_b64: &str) -> ContentPart {
    ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: image_data_uri(image_b64),
        },
    }
}

/// Build content from text plus images.
///
/// Without images the content is the bare text. With images it is an optional
/// leading text part (only when `text` is non-empty) followed by one image
/// part per image, in input order.
fn build_content(text: &str, images: &[String]) -> MessageContent {
    if images.is_empty() {
        return MessageContent::Text(text.to_string());
    }

    let mut parts = Vec::with_capacity(images.len() + 1);
    if !text.is_empty() {
        parts.push(ContentPart::Text {
            text: text.to_string(),
        });
    }
    parts.extend(images.iter().map(|img| image_part(img)));

    MessageContent::Parts(parts)
}

/// Build the message list for an `/api/generate` request
pub fn normalize_generate_request(
    prompt: Option<&str>,
    system: Option<&str>,
    images: Option<&[String]>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);

    if let Some(system) = system.filter(|s| !s.is_empty()) {
        messages.push(Message {
            role: Role::System,
            content: MessageContent::Text(system.to_string()),
        });
    }

    let images = images.unwrap_or_default();
    if !images.is_empty() {
        tracing::info!("Translating {} image(s) for the backend", images.len());
    }

    messages.push(Message {
        role: Role::User,
        content: build_content(prompt.unwrap_or_default(), images),
    });

    messages
}

/// Convert Ollama chat messages (top-level `images`) to OpenAI content parts
pub fn normalize_chat_messages(messages: &[ChatMessage]) -> Vec<Message> {
    messages
        .iter()
        .map(|msg| {
            let images = msg.images.as_deref().unwrap_or_default();
            if !images.is_empty() {
                tracing::info!(
                    role = ?msg.role,
                    "Translating {} image(s) in chat message",
                    images.len()
                );
            }

            Message {
                role: msg.role,
                content: build_content(&msg.content, images),
            }
        })
        .collect()
}
