//! Candle cross-encoder that scores (query, chunk) pairs.
//!
//! The model is a BERT encoder with a single-logit classification head,
//! the layout of the `cross-encoder/ms-marco-*` family.

use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use crate::config::{DevicePreference, RerankerConfig};
use crate::error::{ModelError, ModelResult};
use crate::model_locator::ModelLocator;
use crate::RerankerModel;

/// Pairs scored per forward pass.
const MAX_BATCH_SIZE: usize = 8;

/// Token limit per (query, chunk) pair.
const MAX_SEQUENCE_LENGTH: usize = 512;

/// BERT cross-encoder running on candle.
pub struct CandleRerankerModel {
    model_id: String,
    encoder: BertModel,
    head_weight: Tensor,
    head_bias: Tensor,
    tokenizer: Mutex<Tokenizer>,
    device: Device,
}

impl std::fmt::Debug for CandleRerankerModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleRerankerModel")
            .field("model_id", &self.model_id)
            .field("device", &self.device)
            .finish()
    }
}

// SAFETY: the encoder and head tensors are only read after construction and
// the tokenizer sits behind a Mutex.
unsafe impl Send for CandleRerankerModel {}
unsafe impl Sync for CandleRerankerModel {}

impl CandleRerankerModel {
    /// Load the model described by `config`.
    pub fn new(config: &RerankerConfig) -> ModelResult<Self> {
        let model_dir = config.effective_model_path();
        let model_id = config.model_id.as_str();

        ModelLocator::with_base_dir(&model_dir)
            .validate_model_dir(&model_dir)
            .map_err(|e| match e {
                ModelError::ModelNotFound { .. } => ModelError::ModelNotFound {
                    model_id: model_id.to_string(),
                    path: model_dir.clone(),
                },
                other => other,
            })?;

        info!("Loading reranker '{}' from {:?}", model_id, model_dir);

        let device = select_device(config.device)?;
        let load_err = |e: &dyn Display| ModelError::model_load(model_id, e.to_string());

        let bert_config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;

        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                &[model_dir.join("model.safetensors")],
                DType::F32,
                &device,
            )
            .map_err(|e| load_err(&e))?
        };

        let encoder = BertModel::load(vb.clone(), &bert_config).map_err(|e| load_err(&e))?;
        let head_weight = vb
            .get((1, bert_config.hidden_size), "classifier.weight")
            .map_err(|e| load_err(&format!("classifier.weight: {e}")))?;
        let head_bias = vb
            .get(1, "classifier.bias")
            .map_err(|e| load_err(&format!("classifier.bias: {e}")))?;

        let tokenizer = load_tokenizer(&model_dir.join("tokenizer.json"))
            .map_err(|e| load_err(&e))?;

        info!("Reranker ready on {:?}", device);

        Ok(Self {
            model_id: model_id.to_string(),
            encoder,
            head_weight,
            head_bias,
            tokenizer: Mutex::new(tokenizer),
            device,
        })
    }

    fn failed(&self, e: impl Display) -> ModelError {
        ModelError::reranking_failed(&self.model_id, e)
    }

    fn encode_pairs(&self, query: &str, chunks: &[String]) -> ModelResult<Vec<Encoding>> {
        let tokenizer = self.tokenizer.lock().map_err(|e| self.failed(e))?;
        let pairs: Vec<(String, String)> = chunks
            .iter()
            .map(|chunk| (query.to_string(), chunk.clone()))
            .collect();
        tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| ModelError::tokenization(&self.model_id, e))
    }

    /// One forward pass over at most `MAX_BATCH_SIZE` pairs.
    fn score_window(&self, query: &str, chunks: &[String]) -> ModelResult<Vec<f32>> {
        let encodings = self.encode_pairs(query, chunks)?;
        let rows = encodings.len();
        let width = encodings.iter().map(|e| e.len()).max().unwrap_or(0);

        let mut ids = Vec::with_capacity(rows * width);
        let mut mask = Vec::with_capacity(rows * width);
        let mut segments = Vec::with_capacity(rows * width);
        for encoding in &encodings {
            let pad = width - encoding.len();
            ids.extend(encoding.get_ids().iter().copied().chain(std::iter::repeat_n(0, pad)));
            mask.extend(
                encoding
                    .get_attention_mask()
                    .iter()
                    .copied()
                    .chain(std::iter::repeat_n(0, pad)),
            );
            segments.extend(
                encoding
                    .get_type_ids()
                    .iter()
                    .copied()
                    .chain(std::iter::repeat_n(0, pad)),
            );
        }

        let to_tensor = |data: Vec<u32>| {
            Tensor::from_vec(data, (rows, width), &self.device).map_err(|e| self.failed(e))
        };
        let ids = to_tensor(ids)?;
        let mask = to_tensor(mask)?;
        let segments = to_tensor(segments)?;

        // [rows, width, hidden] → CLS row [rows, hidden]
        let hidden = self
            .encoder
            .forward(&ids, &segments, Some(&mask))
            .map_err(|e| self.failed(e))?;
        let cls = hidden
            .narrow(1, 0, 1)
            .and_then(|t| t.squeeze(1))
            .map_err(|e| self.failed(e))?;

        // logits = cls · Wᵀ + b → [rows]
        let logits = self
            .head_weight
            .t()
            .and_then(|wt| cls.matmul(&wt))
            .and_then(|t| t.broadcast_add(&self.head_bias))
            .and_then(|t| t.squeeze(1))
            .map_err(|e| self.failed(e))?;

        logits.to_vec1::<f32>().map_err(|e| self.failed(e))
    }
}

impl RerankerModel for CandleRerankerModel {
    fn score_batch(&self, query: &str, documents: &[String]) -> ModelResult<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Cross-encoding {} chunks on {:?}",
            documents.len(),
            self.device
        );

        let mut scores = Vec::with_capacity(documents.len());
        for window in documents.chunks(MAX_BATCH_SIZE) {
            scores.extend(self.score_window(query, window)?);
        }
        Ok(scores)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer, String> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| e.to_string())?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id: 0,
        pad_token: "[PAD]".to_string(),
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQUENCE_LENGTH,
            ..Default::default()
        }))
        .map_err(|e| e.to_string())?;
    Ok(tokenizer)
}

/// `Auto` stays on CPU: batched matmul in cross-encoders is unreliable on Metal.
fn select_device(preference: DevicePreference) -> ModelResult<Device> {
    match preference {
        DevicePreference::Auto | DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Gpu => match gpu_device() {
            Some(device) => {
                warn!("Reranker running on GPU; fall back to `device: cpu` if scoring fails");
                Ok(device)
            }
            None => Err(ModelError::DeviceNotAvailable {
                reason: gpu_unavailable_reason().to_string(),
            }),
        },
    }
}

fn gpu_device() -> Option<Device> {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => return Some(device),
            Err(e) => debug!("Metal not available: {}", e),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => return Some(device),
            Err(e) => debug!("CUDA not available: {}", e),
        }
    }

    None
}

fn gpu_unavailable_reason() -> &'static str {
    if cfg!(feature = "metal") {
        "Metal GPU not available on this system"
    } else if cfg!(feature = "cuda") {
        "CUDA GPU not available. Ensure NVIDIA drivers and the CUDA toolkit are installed"
    } else {
        "irra was built without GPU support. Rebuild with --features metal or --features cuda"
    }
}
