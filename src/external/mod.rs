pub mod atlascloud;
pub mod generation_provider;
pub mod google_ai;

#[cfg(test)]
pub mod scripted_provider;

pub use atlascloud::AtlasCloudProvider;
pub use generation_provider::{GenerationProvider, GenerationRequest, ProviderTaskStatus, TaskPoll};
pub use google_ai::GoogleAiProvider;
