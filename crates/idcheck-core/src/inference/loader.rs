//! Weight loading from safetensors files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use once_cell::sync::OnceCell;
use safetensors::SafeTensors;
use tracing::debug;

/// A model built from its weights on first use.
///
/// Loading happens at most once; concurrent first calls block on the same
/// cell, and every later call borrows the loaded model.
pub struct LazyModel<T> {
    path: PathBuf,
    device: Device,
    builder: fn(VarBuilder) -> Result<T>,
    model: OnceCell<T>,
}

impl<T: Send + Sync> LazyModel<T> {
    /// Creates a loader; nothing is read until [`LazyModel::get`].
    #[must_use]
    pub fn new(
        path: impl AsRef<Path>,
        device: Device,
        builder: fn(VarBuilder) -> Result<T>,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            device,
            builder,
            model: OnceCell::new(),
        }
    }

    /// Returns the model, loading it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights cannot be read or parsed, or the
    /// builder rejects them. A failed load is retried on the next call.
    pub fn get(&self) -> Result<&T> {
        self.model.get_or_try_init(|| {
            debug!(path = %self.path.display(), "Loading detector weights");
            let vb = load_safetensors(&self.path, &self.device)?;
            (self.builder)(vb)
                .with_context(|| format!("Invalid model weights: {}", self.path.display()))
        })
    }

    /// Weights file backing this model.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the weights have been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }
}

/// Reads a safetensors file into a `VarBuilder` on `device`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid safetensors,
/// or holds a dtype Candle cannot represent.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;
    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let tensor_map = tensors
        .tensors()
        .into_iter()
        .map(|(name, view)| {
            let dtype = candle_dtype(view.dtype())
                .with_context(|| format!("Tensor '{name}' in {}", path.display()))?;
            let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
                .with_context(|| format!("Failed to create tensor '{name}'"))?;
            Ok((name, tensor))
        })
        .collect::<Result<HashMap<String, Tensor>>>()?;

    debug!(
        path = %path.display(),
        tensors = tensor_map.len(),
        "Loaded safetensors"
    );
    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

fn candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    Ok(match dtype {
        S::F32 => DType::F32,
        S::F64 => DType::F64,
        S::F16 => DType::F16,
        S::BF16 => DType::BF16,
        S::I64 => DType::I64,
        S::U32 => DType::U32,
        S::U8 => DType::U8,
        other => anyhow::bail!("unsupported dtype {other:?}"),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn weights_file(data: &[f32], shape: Vec<usize>) -> NamedTempFile {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let view = safetensors::tensor::TensorView::new(safetensors::Dtype::F32, shape, bytes)
            .expect("view");
        let serialized = safetensors::serialize(HashMap::from([("w".to_string(), view)]), &None)
            .expect("serialize");
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&serialized).expect("write");
        file
    }

    #[test]
    fn test_load_safetensors() {
        let file = weights_file(&[1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let vb = load_safetensors(file.path(), &Device::Cpu).unwrap();
        assert!(vb.contains_tensor("w"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_safetensors("/nonexistent/weights.safetensors", &Device::Cpu).err().expect("expected error");
        assert!(err.to_string().contains("Failed to read model file"));
    }

    #[test]
    fn test_load_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not safetensors").unwrap();
        assert!(load_safetensors(file.path(), &Device::Cpu).is_err());
    }

    #[test]
    fn test_lazy_model_loads_once() {
        let file = weights_file(&[0.5], vec![1]);
        let lazy = LazyModel::new(file.path(), Device::Cpu, |vb| {
            Ok(vb.get(1, "w")?.to_vec1::<f32>()?)
        });
        assert!(!lazy.is_loaded());
        assert_eq!(lazy.get().unwrap(), &vec![0.5]);
        assert!(lazy.is_loaded());
        assert_eq!(lazy.path(), file.path());
    }
}
