//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use malik::api::ApiServerBuilder;
use malik::brain::Completion;
use malik::voice::Synthesizer;
use malik::{CommandRouter, Error, Result};

/// Completion backend that answers with a fixed prefix
pub struct EchoCompletion;

#[async_trait]
impl Completion for EchoCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(format!("echo: {prompt}"))
    }
}

/// Synthesizer that returns fake MP3 bytes
pub struct FakeSynthesizer;

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(text.as_bytes());
        Ok(audio)
    }
}

/// Synthesizer whose service is always down
pub struct FailingSynthesizer;

#[async_trait]
impl Synthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Err(Error::Tts("service unavailable".to_string()))
    }
}

/// Build a test API router serving `static_dir`
pub fn build_test_router(
    static_dir: &Path,
    synthesizer: Option<Arc<dyn Synthesizer>>,
) -> axum::Router {
    let router = CommandRouter::new(Some(Arc::new(EchoCompletion)));
    ApiServerBuilder::new(router)
        .synthesizer(synthesizer)
        .static_dir(static_dir)
        .build()
        .router()
}
