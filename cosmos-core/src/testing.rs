//! Scripted model used by unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use crate::model::{
    CompletionRequest, GeneratedImage, GenerativeModel, ImageRequest, TextStream,
};
use crate::{Error, Result};

/// How a scripted stream behaves
pub(crate) enum StreamScript {
    /// Yield each item then end
    Items(Vec<Result<String>>),
    /// Yield the fragments then never produce another item
    Stall(Vec<String>),
    /// Fail before the stream is opened
    OpenError(Error),
}

impl StreamScript {
    pub(crate) fn ok<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StreamScript::Items(fragments.into_iter().map(|f| Ok(f.into())).collect())
    }
}

/// A [`GenerativeModel`] that replays queued responses and records requests
#[derive(Default)]
pub(crate) struct ScriptedModel {
    completions: Mutex<VecDeque<Result<String>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    images: Mutex<VecDeque<Result<Vec<GeneratedImage>>>>,
    pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    pub(crate) image_requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_completion(self, response: Result<String>) -> Self {
        self.completions.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn with_json(self, value: serde_json::Value) -> Self {
        self.with_completion(Ok(value.to_string()))
    }

    pub(crate) fn with_stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub(crate) fn with_images(self, response: Result<Vec<GeneratedImage>>) -> Self {
        self.images.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn last_request(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::model("no scripted completion", false)))
    }

    async fn generate_stream(&self, request: &CompletionRequest) -> Result<TextStream> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| StreamScript::OpenError(Error::model("no scripted stream", false)));

        match script {
            StreamScript::Items(items) => Ok(futures::stream::iter(items).boxed()),
            StreamScript::Stall(fragments) => Ok(futures::stream::iter(
                fragments.into_iter().map(Ok::<_, Error>),
            )
            .chain(futures::stream::pending())
            .boxed()),
            StreamScript::OpenError(err) => Err(err),
        }
    }

    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>> {
        self.image_requests.lock().unwrap().push(request.clone());
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::model("no scripted image", false)))
    }
}

/// A one-pixel PNG payload stand-in
pub(crate) fn png(bytes: &[u8]) -> GeneratedImage {
    GeneratedImage {
        mime_type: "image/png".to_string(),
        bytes: bytes.to_vec(),
    }
}
