use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ProxyError, Result};
use crate::models::ollama::{
    ChatResponse, GenerateResponse, ModelDetails, ModelInfo, ResponseMessage, ShowResponse,
    TagsResponse, TimingStats,
};
use crate::models::openai::{ChatCompletionResponse, ModelEntry, ModelList, Usage};

/// Current UTC time as ISO-8601 with a `Z` suffix
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Unix seconds as ISO-8601 UTC; out-of-range values fall back to now
pub fn iso_from_unix(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(iso_timestamp)
}

impl From<&Usage> for TimingStats {
    fn from(usage: &Usage) -> Self {
        let seconds = usage.total_duration_sec.unwrap_or(0.0).max(0.0);
        Self {
            total_duration: Some((seconds * 1_000_000_000.0) as u64),
            prompt_eval_count: Some(usage.prompt_tokens),
            eval_count: Some(usage.completion_tokens),
        }
    }
}

fn first_message_content(resp: &ChatCompletionResponse) -> Result<String> {
    let choice = resp.choices.first().ok_or_else(|| {
        ProxyError::InvalidBackendResponse("response contains no choices".to_string())
    })?;
    Ok(choice.message.content.clone().unwrap_or_default())
}

fn stats_of(resp: &ChatCompletionResponse) -> TimingStats {
    resp.usage.as_ref().map(TimingStats::from).unwrap_or_default()
}

/// Reshape a non-streaming completion into an `/api/chat` response
pub fn chat_response_from_completion(
    resp: &ChatCompletionResponse,
    requested_model: &str,
) -> Result<ChatResponse> {
    let content = first_message_content(resp)?;
    let role = resp.choices[0].message.role;

    Ok(ChatResponse {
        model: resp
            .model
            .clone()
            .unwrap_or_else(|| requested_model.to_string()),
        created_at: iso_timestamp(),
        message: ResponseMessage { role, content },
        done: true,
        stats: stats_of(resp),
    })
}

/// Reshape a non-streaming completion into an `/api/generate` response
pub fn generate_response_from_completion(
    resp: &ChatCompletionResponse,
    requested_model: &str,
) -> Result<GenerateResponse> {
    Ok(GenerateResponse {
        model: resp
            .model
            .clone()
            .unwrap_or_else(|| requested_model.to_string()),
        created_at: iso_timestamp(),
        response: first_message_content(resp)?,
        done: true,
        context: Some(Vec::new()),
        stats: stats_of(resp),
    })
}

/// Coarse family: everything before the first hyphen, or the whole id
pub fn model_family(model_id: &str) -> &str {
    model_id.split('-').next().unwrap_or(model_id)
}

fn placeholder_details(family: &str) -> ModelDetails {
    ModelDetails {
        format: "gguf".to_string(),
        family: family.to_string(),
        families: Some(vec![family.to_string()]),
        parameter_size: "N/A".to_string(),
        quantization_level: "N/A".to_string(),
    }
}

/// Display record for one backend model; entries without an id are skipped
pub fn model_info(entry: &ModelEntry) -> Option<ModelInfo> {
    let id = entry.id.as_deref().filter(|id| !id.is_empty())?;

    let modified_at = match entry.created {
        Some(created) => iso_from_unix(created),
        None => iso_timestamp(),
    };

    Some(ModelInfo {
        name: id.to_string(),
        model: id.to_string(),
        modified_at,
        size: entry.size.unwrap_or(0),
        digest: id.to_string(),
        details: placeholder_details(model_family(id)),
    })
}

pub fn tags_from_model_list(list: &ModelList) -> TagsResponse {
    TagsResponse {
        models: list.data.iter().filter_map(model_info).collect(),
    }
}

/// Fixed descriptor for `/api/show`; the backend exposes no model metadata
pub fn show_placeholder() -> ShowResponse {
    ShowResponse {
        modelfile: String::new(),
        parameters: String::new(),
        template: "{{ .Prompt }}".to_string(),
        details: placeholder_details("unknown"),
        model_info: serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_family() {
        assert_eq!(model_family("mistralai/magistral-small-2509"), "mistralai/magistral");
        assert_eq!(model_family("llama-3.1-8b"), "llama");
        assert_eq!(model_family("qwen2"), "qwen2");
    }

    #[test]
    fn test_iso_from_unix() {
        assert_eq!(iso_from_unix(1_720_000_000), "2024-07-03T09:46:40Z");
        assert!(iso_from_unix(i64::MAX).ends_with('Z'));
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_usage_to_stats() {
        let stats = TimingStats::from(&Usage {
            prompt_tokens: 10,
            completion_tokens: 20,
            total_tokens: Some(30),
            total_duration_sec: Some(1.5),
        });
        assert_eq!(stats.total_duration, Some(1_500_000_000));
        assert_eq!(stats.prompt_eval_count, Some(10));
        assert_eq!(stats.eval_count, Some(20));

        let no_duration = TimingStats::from(&Usage::default());
        assert_eq!(no_duration.total_duration, Some(0));
    }

    #[test]
    fn test_model_info_skips_missing_id() {
        assert!(model_info(&ModelEntry::default()).is_none());
    }
}
