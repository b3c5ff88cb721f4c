#[cfg(feature = "anthropic")]
pub mod anthropic_provider;

#[cfg(feature = "anthropic")]
pub use anthropic_provider::AnthropicGenerationClient;
