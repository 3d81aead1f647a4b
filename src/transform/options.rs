use crate::models::ollama::GenerationOptions;
use crate::models::openai::SamplingParams;

/// Map Ollama generation options to OpenAI sampling parameters
///
/// | Ollama           | OpenAI              |
/// |------------------|---------------------|
/// | `temperature`    | `temperature`       |
/// | `top_p`          | `top_p`             |
/// | `stop`           | `stop`              |
/// | `seed`           | `seed`              |
/// | `top_k`          | `top_k`             |
/// | `num_predict`    | `max_tokens`        |
/// | `repeat_penalty` | `frequency_penalty` |
///
/// Values are copied untouched and absent options stay absent.
pub fn map_options(options: &GenerationOptions) -> SamplingParams {
    SamplingParams {
        temperature: options.temperature,
        top_p: options.top_p,
        stop: options.stop.clone(),
        seed: options.seed,
        top_k: options.top_k,
        max_tokens: options.num_predict,
        frequency_penalty: options.repeat_penalty,
    }
}
