//! Devreview - a thin OpenAI chat-completion client for developer reviews.

pub mod client;
pub mod config;
pub mod llm;

pub use client::{ClientError, Generation, Malformation, OpenAIClient, SYSTEM_PROMPT};
pub use config::{ClientConfig, Config, ConfigError, GenerationSettings};
