use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub scoring_rules_file: PathBuf,
    pub universities_kb_file: PathBuf,
    pub certifications_kb_file: PathBuf,
    pub rag_data_file: PathBuf,
    pub results_dir: PathBuf,
    /// When set, reports go to Postgres instead of `results_dir`.
    pub database_url: Option<String>,
    pub generation_url: String,
    pub generation_api_key: Option<String>,
    /// When unset, the local hashed embedder is used.
    pub embedding_url: Option<String>,
    /// When unset, reports are not forwarded.
    pub forward_url: Option<String>,
    pub retrieval_top_k: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", "8001")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            scoring_rules_file: env_or("SCORING_RULES_FILE", "data/scoring_rules.json").into(),
            universities_kb_file: env_or("UNIVERSITIES_KB_FILE", "data/universities.json").into(),
            certifications_kb_file: env_or("CERTIFICATIONS_KB_FILE", "data/certifications.json")
                .into(),
            rag_data_file: env_or("RAG_DATA_FILE", "data/rag_data.json").into(),
            results_dir: env_or("RESULTS_DIR", "evaluation_results").into(),
            database_url: optional_env("DATABASE_URL"),
            generation_url: require_env("GENERATION_URL")?,
            generation_api_key: optional_env("GENERATION_API_KEY"),
            embedding_url: optional_env("EMBEDDING_URL"),
            forward_url: optional_env("FORWARD_URL"),
            retrieval_top_k: env_or("RETRIEVAL_TOP_K", "3")
                .parse::<usize>()
                .context("RETRIEVAL_TOP_K must be a non-negative integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
