/// OpenRouter chat-completions gateway.
pub mod openrouter;
