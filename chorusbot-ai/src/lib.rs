pub mod provider;
pub mod runtime;

// Re-export public APIs
pub use provider::{GenerationParams, ModelProvider, OpenAiProvider, PromptMessage, ProviderConfig};
pub use runtime::PersonaRuntime;
