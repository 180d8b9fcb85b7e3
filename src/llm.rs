use anyhow::{anyhow, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client as OpenAIClient;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::generation::parameters::FormatType;
use ollama_rs::Ollama;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::prompt::SYSTEM_PROMPT;
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

const LLM_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_COMPLETION_TOKENS: u32 = 300;

/// Sends a single request to the configured backend. Returns `None` on error,
/// timeout, or an empty reply; callers drop the text rather than retrying.
pub async fn generate_llm_response(prompt: &str, params: &LLMParams) -> Option<String> {
    debug!(target: TARGET_LLM_REQUEST, "Sending LLM request to model {}: {}", params.model, prompt);

    let result = match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            timeout(LLM_TIMEOUT, generate_ollama(ollama, prompt, params)).await
        }
        LLMClient::OpenAI(client) => {
            timeout(LLM_TIMEOUT, generate_openai(client, prompt, params)).await
        }
    };

    match result {
        Ok(Ok(response)) if response.trim().is_empty() => {
            warn!(target: TARGET_LLM_REQUEST, "LLM returned an empty response");
            None
        }
        Ok(Ok(response)) => {
            debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", response);
            Some(response)
        }
        Ok(Err(e)) => {
            error!(target: TARGET_LLM_REQUEST, "Error generating response: {:#}", e);
            None
        }
        Err(_) => {
            error!(
                target: TARGET_LLM_REQUEST,
                "LLM request timed out after {} seconds",
                LLM_TIMEOUT.as_secs()
            );
            None
        }
    }
}

/// Same system message as the OpenAI path, with the reply constrained to JSON.
fn ollama_request(prompt: &str, params: &LLMParams) -> GenerationRequest<'static> {
    let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
    request.system = Some(SYSTEM_PROMPT.to_string().into());
    request.options = Some(GenerationOptions::default().temperature(params.temperature));
    request.format = Some(FormatType::Json);
    request
}

async fn generate_ollama(ollama: &Ollama, prompt: &str, params: &LLMParams) -> Result<String> {
    let request = ollama_request(prompt, params);

    let response = ollama
        .generate(request)
        .await
        .map_err(|e| anyhow!("Ollama request failed: {}", e))?;
    Ok(response.response)
}

async fn generate_openai(
    client: &OpenAIClient<OpenAIConfig>,
    prompt: &str,
    params: &LLMParams,
) -> Result<String> {
    let messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?
            .into(),
    ];

    let request = CreateChatCompletionRequestArgs::default()
        .model(params.model.as_str())
        .messages(messages)
        .temperature(params.temperature)
        .max_completion_tokens(MAX_COMPLETION_TOKENS)
        .build()?;

    let response = client.chat().create(request).await?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| anyhow!("OpenAI response contained no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_request_carries_system_prompt() {
        let params = LLMParams {
            llm_client: LLMClient::Ollama(Ollama::new("http://localhost".to_string(), 11434)),
            model: "llama3.1".to_string(),
            temperature: 0.0,
        };
        let request = ollama_request("Program: MD", &params);

        assert_eq!(request.system.as_deref(), Some(SYSTEM_PROMPT));
        assert!(matches!(request.format, Some(FormatType::Json)));
    }
}
