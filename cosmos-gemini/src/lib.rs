//! Gemini backend for Cosmos
//!
//! Provides [`GeminiClient`], the production implementation of
//! [`cosmos_core::model::GenerativeModel`].

mod client;
pub mod error;

pub use client::{
    chunk_text, completion_body, decode_images, image_body, map_http_error, parse_stream_line,
    GeminiClient, GenerateContentResponse, PredictResponse, SseDecoder,
};
pub use error::{GeminiError, Result};
