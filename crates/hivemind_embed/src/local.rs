//! Local embedding backend (fastembed / ONNX).
//!
//! The model is not thread-safe and inference is CPU-bound, so a single
//! dedicated worker thread owns it. Requests flow through a bounded
//! queue; when the queue is full the submission fails fast with
//! [`EmbedError::Busy`] instead of piling up memory.

use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::thread;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::{l2_normalize, EmbedError, Embedder};

const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DIMENSIONS: usize = 384;

struct Job {
    texts: Vec<String>,
    reply: oneshot::Sender<Result<Vec<Vec<f32>>, EmbedError>>,
}

/// Process-wide embedder backed by all-MiniLM-L6-v2.
///
/// Construction loads the model and runs a warm-up inference; it is
/// expensive and must happen once at process start, never in a hot path.
pub struct FastembedEmbedder {
    tx: SyncSender<Job>,
}

impl FastembedEmbedder {
    pub fn new(queue_depth: usize) -> Result<Self, EmbedError> {
        let (tx, rx) = sync_channel::<Job>(queue_depth.max(1));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), EmbedError>>();

        thread::Builder::new()
            .name("hivemind-embed".into())
            .spawn(move || {
                let model = match TextEmbedding::try_new(
                    InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                        .with_show_download_progress(false),
                ) {
                    Ok(m) => m,
                    Err(e) => {
                        let _ = ready_tx.send(Err(EmbedError::Inference(e.to_string())));
                        return;
                    }
                };

                // Warm-up so the first real request does not pay the
                // lazy-initialisation cost.
                if let Err(e) = model.embed(vec!["warm-up"], None) {
                    let _ = ready_tx.send(Err(EmbedError::Inference(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                info!(model = MODEL_ID, dimensions = DIMENSIONS, "embedder ready");

                while let Ok(job) = rx.recv() {
                    let result = model
                        .embed(job.texts, None)
                        .map(|vectors| {
                            vectors
                                .into_iter()
                                .map(|mut v| {
                                    l2_normalize(&mut v);
                                    v
                                })
                                .collect::<Vec<_>>()
                        })
                        .map_err(|e| EmbedError::Inference(e.to_string()));
                    let _ = job.reply.send(result);
                }
            })
            .map_err(|e| EmbedError::Inference(format!("failed to spawn worker: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { tx }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EmbedError::Inference("embedder worker died during init".into())),
        }
    }

    async fn submit(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        match self.tx.try_send(Job {
            texts,
            reply: reply_tx,
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(EmbedError::Busy),
            Err(TrySendError::Disconnected(_)) => {
                error!("embedder worker is gone");
                return Err(EmbedError::Inference("embedder worker terminated".into()));
            }
        }
        reply_rx
            .await
            .map_err(|_| EmbedError::Inference("embedder worker dropped the request".into()))?
    }
}

#[async_trait]
impl Embedder for FastembedEmbedder {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.submit(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::Inference("empty batch result".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.submit(texts.to_vec()).await
    }
}
