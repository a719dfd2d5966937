pub mod api;
pub mod client;
pub mod convert;

pub use api::{ChatCompletion, ChatCompletionRequest, Choice, DEFAULT_MODEL};
pub use client::{MoonshotClient, MoonshotClientBuilder, DEFAULT_BASE_URL, DEFAULT_COMPLETIONS_PATH};
pub use convert::RoleCache;
