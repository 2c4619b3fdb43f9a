//! 多模态请求适配器 — 将评测框架的请求转换为 Gemini API 调用。
//!
//! The multimodal request adapter. For each harness request, in order and
//! fully sequential (one request completes, including cache persistence,
//! before the next begins):
//!
//! 1. cache check — a non-empty cached answer is returned without an API call;
//! 2. media resolution — audio is WAV-encoded and uploaded, video is uploaded
//!    with a processing poll (a failed upload is logged and the item dropped),
//!    images pass through inline;
//! 3. payload construction — interleaved when configured, flat otherwise;
//! 4. generation call under the bounded retry driver;
//! 5. unconditional release of this request's uploaded video handles;
//! 6. write-through cache update with the (possibly empty) answer.
//!
//! Remote and media failures degrade to an empty answer so the evaluation
//! run completes; only capability and configuration violations surface.

use crate::cache::{CacheMode, RequestKey, ResponseCache};
use crate::client::GeminiClient;
use crate::config::{AdapterConfig, GenParams};
use crate::harness::{DistributedContext, EvalModel, GenerateRequest};
use crate::media::{FileHandle, MediaItem, Part};
use crate::payload;
use crate::retry::run_with_retry;
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// Gemini-backed implementation of the harness model interface.
#[derive(Debug)]
pub struct GeminiAdapter {
    config: AdapterConfig,
    client: GeminiClient,
    cache: Option<ResponseCache>,
    distributed: DistributedContext,
    video_pool: Vec<FileHandle>,
}

impl GeminiAdapter {
    /// Build an adapter, reading the distributed role from the launcher's
    /// environment.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        Self::with_distributed(config, DistributedContext::from_env())
    }

    /// Build an adapter with an explicit distributed role.
    ///
    /// Continual mode assumes single-writer access to one cache file, so
    /// requesting it together with multi-process execution fails here,
    /// before any request is processed.
    pub fn with_distributed(
        config: AdapterConfig,
        distributed: DistributedContext,
    ) -> Result<Self> {
        if config.continual_mode && distributed.is_distributed() {
            return Err(Error::configuration(
                "continual mode is not supported with distributed inference",
            ));
        }
        if distributed.is_distributed() && distributed.is_main_process() {
            info!(
                world_size = distributed.world_size,
                "running with data parallelism"
            );
        }

        let client = GeminiClient::new(&config.base_url, config.timeout, config.poll_delay)?;
        let cache = if config.continual_mode {
            Some(ResponseCache::open(config.response_file())?)
        } else {
            None
        };

        Ok(Self {
            config,
            client,
            cache,
            distributed,
            video_pool: Vec::new(),
        })
    }

    /// Whether the cache resumed from a prior run's file.
    pub fn cache_mode(&self) -> Option<CacheMode> {
        self.cache.as_ref().map(ResponseCache::mode)
    }

    /// Convert resolved media items into payload parts. Audio is encoded to
    /// WAV and uploaded; video is uploaded and polled until processed, with
    /// upload failures logged and the item dropped; images stay inline.
    async fn resolve_media(&mut self, items: Vec<MediaItem>) -> Result<Vec<Part>> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            match item {
                MediaItem::Image { bytes, mime_type } => {
                    parts.push(Part::inline(mime_type, bytes));
                }
                MediaItem::Audio(clip) => {
                    let wav = clip.to_wav_bytes()?;
                    let handle = self.client.upload_file(wav, "audio/wav", "audio.wav").await?;
                    parts.push(Part::File(handle));
                }
                MediaItem::Video { path } => {
                    match payload::upload_video(&self.client, &path).await {
                        Ok(handle) => {
                            self.video_pool.push(handle.clone());
                            parts.push(Part::File(handle));
                        }
                        Err(err) => {
                            error!(
                                path = %path.display(),
                                error = %err,
                                "error converting video, dropping item"
                            );
                        }
                    }
                }
            }
        }
        Ok(parts)
    }

    /// Delete every video uploaded for the current request, success or not.
    async fn release_videos(&mut self) {
        let handles = std::mem::take(&mut self.video_pool);
        for handle in handles {
            if let Err(err) = self.client.delete_file(&handle.name).await {
                warn!(name = %handle.name, error = %err, "failed to release video handle");
            }
        }
    }

    async fn process_request(&mut self, request: GenerateRequest) -> Result<String> {
        let key = RequestKey::new(
            request.task.as_str(),
            request.split.as_str(),
            request.doc_id,
        );

        // Only a non-empty answer from a resumed cache short-circuits; an
        // empty entry records a prior failure and triggers a fresh call.
        if let Some(cache) = &self.cache {
            if cache.mode() == CacheMode::Resume {
                if let Some(answer) = cache.lookup(&key) {
                    if !answer.is_empty() {
                        debug!(key = %key, "serving cached answer");
                        return Ok(answer.to_string());
                    }
                }
            }
        }

        let params = GenParams::from_kwargs(&request.gen_kwargs);
        let media = (request.resolver)();
        let resolved = self.resolve_media(media).await?;
        let parts = if self.config.interleave {
            payload::interleaved(&request.context, &resolved)
        } else {
            payload::flat(&request.context, resolved)
        };

        let answer = {
            let client = &self.client;
            let model = self.config.model_version.as_str();
            let parts_ref = &parts;
            let params_ref = &params;
            let outcome = run_with_retry(&self.config.retry, move || {
                client.generate_content(model, parts_ref, params_ref)
            })
            .await;
            match outcome {
                Ok(resp) => resp.text,
                Err(err) => {
                    if let Some(feedback) = err.prompt_feedback() {
                        info!(feedback, "prompt feedback");
                    }
                    error!(key = %key, error = %err, "generation failed, recording empty answer");
                    String::new()
                }
            }
        };

        self.release_videos().await;

        if let Some(cache) = &mut self.cache {
            cache.store(&key, answer.as_str())?;
        }
        Ok(answer)
    }
}

#[async_trait]
impl EvalModel for GeminiAdapter {
    async fn generate_until(&mut self, requests: Vec<GenerateRequest>) -> Result<Vec<String>> {
        let total = requests.len();
        let mut answers = Vec::with_capacity(total);
        for (index, request) in requests.into_iter().enumerate() {
            let answer = self.process_request(request).await?;
            answers.push(answer);
            debug!(completed = index + 1, total, "model responding");
        }
        Ok(answers)
    }

    async fn generate_until_multi_round(
        &mut self,
        _requests: Vec<GenerateRequest>,
    ) -> Result<Vec<String>> {
        Err(Error::Unsupported("multi-round generation"))
    }

    async fn loglikelihood(
        &mut self,
        _requests: Vec<GenerateRequest>,
    ) -> Result<Vec<(f64, bool)>> {
        Err(Error::Unsupported("loglikelihood scoring"))
    }

    fn rank(&self) -> usize {
        self.distributed.rank
    }

    fn world_size(&self) -> usize {
        self.distributed.world_size
    }
}
