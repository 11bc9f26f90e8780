//! Runtime configuration, read once at startup from flags or the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

pub const DEFAULT_PROVIDER_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

#[derive(Parser, Debug, Clone)]
#[command(name = "caption-ai", version, about = "AI caption and hashtag generator")]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// File holding the single `GROQ_API_KEY=<key>` line
    #[arg(long, env = "CAPTION_KEY_FILE", default_value = ".env")]
    pub key_file: PathBuf,

    /// Base URL of the OpenAI-compatible provider API
    #[arg(long, env = "GROQ_BASE_URL", default_value = DEFAULT_PROVIDER_URL)]
    pub provider_base_url: String,

    /// Vision-capable model used for caption generation
    #[arg(long, env = "CAPTION_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Upper bound on every provider round trip
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 60)]
    pub provider_timeout_secs: u64,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Reject uploads whose bytes do not match the declared image type
    #[arg(long, env = "VERIFY_IMAGE_BYTES", default_value_t = true, action = ArgAction::Set)]
    pub verify_image_bytes: bool,
}

impl Config {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
