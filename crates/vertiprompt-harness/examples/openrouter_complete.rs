use vertiprompt_harness::prelude::*;
use vertiprompt_harness::vendors::openrouter::OpenRouterTransport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let transport = OpenRouterTransport::from_env()?;
    let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();

    let result = transport
        .complete_chat(
            GenerationRequest::new(
                api_key,
                "openrouter/auto",
                vec![
                    ChatMessage::system("You are a concise assistant. Reply with a JSON object."),
                    ChatMessage::user(r#"{"task":"say hello"}"#),
                ],
            )
            .max_tokens(128)
            .response_format(Some(ResponseFormat::JsonObject)),
        )
        .await?;

    println!("[{}] {}", result.model_id, result.content);
    if let Some(usage) = result.usage {
        println!(
            "prompt_tokens={} completion_tokens={}",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
    Ok(())
}
