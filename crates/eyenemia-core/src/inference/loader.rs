//! Safetensors weight loading.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

/// Reads a safetensors file into a `VarBuilder` on `device`.
///
/// Every tensor is materialized eagerly so a truncated or mistyped file fails
/// here rather than during the first inference.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid safetensors, or
/// holds a dtype candle cannot represent.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read weights: {}", path.display()))?;
    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Invalid safetensors file: {}", path.display()))?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::new();
    for (name, view) in tensors.tensors() {
        let dtype = candle_dtype(view.dtype())
            .with_context(|| format!("Tensor '{name}' in {}", path.display()))?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;
        tensor_map.insert(name, tensor);
    }
    debug!("{}: {} tensors", path.display(), tensor_map.len());

    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

fn candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[allow(clippy::expect_used)]
    fn weights_file(dtype: safetensors::Dtype, bytes: &[u8], shape: Vec<usize>) -> NamedTempFile {
        use safetensors::serialize;
        use safetensors::tensor::TensorView;

        let tensor = TensorView::new(dtype, shape, bytes).expect("valid tensor view");
        let tensors = HashMap::from([("conv1.weight".to_string(), tensor)]);
        let serialized = serialize(&tensors, &None).expect("serialize");

        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&serialized).expect("write");
        file
    }

    #[test]
    fn test_load_reads_named_tensor() {
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let file = weights_file(safetensors::Dtype::F32, bytemuck::cast_slice(&data), vec![2, 2]);
        let vb = load_safetensors(file.path(), &Device::Cpu);
        let vb = vb.unwrap_or_else(|e| panic!("{e:#}"));
        assert!(vb.contains_tensor("conv1.weight"));
        let t = vb.get((2, 2), "conv1.weight");
        assert!(t.is_ok());
    }

    #[test]
    fn test_unsupported_dtype() {
        let file = weights_file(safetensors::Dtype::I16, &[0, 0, 0, 0], vec![2]);
        let err = load_safetensors(file.path(), &Device::Cpu).err();
        assert!(err.is_some_and(|e| format!("{e:#}").contains("Unsupported dtype")));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_safetensors("/nonexistent/eye-seg.safetensors", &Device::Cpu).is_err());
    }

    #[test]
    fn test_garbage_file() {
        let mut file = NamedTempFile::new().unwrap_or_else(|e| panic!("{e}"));
        let written = file.write_all(b"not safetensors");
        assert!(written.is_ok());
        assert!(load_safetensors(file.path(), &Device::Cpu).is_err());
    }
}
