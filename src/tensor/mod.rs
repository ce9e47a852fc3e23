//! Tensor type for the inference feed
//!
//! A minimal tensor abstraction: a little-endian byte buffer, a shape, an
//! element type, and an explicit location tag. Device-resident tensors carry
//! an engine-supplied release hook that frees accelerator memory; the hook
//! runs exactly once, on explicit `release()` or on drop, so device memory
//! is freed deterministically on every overwrite path.

mod dtype;

pub use dtype::DType;

use crate::{Error, Result};

/// Where the backing memory of a tensor lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Ordinary host memory, freed by drop
    Host,
    /// Accelerator memory, must be released through the engine hook
    Device,
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A tensor with owned data
pub struct Tensor {
    /// Raw little-endian data buffer
    data: Vec<u8>,
    /// Element type
    dtype: DType,
    /// Shape (dimensions)
    shape: Vec<usize>,
    /// Backing-memory location
    location: Location,
    /// Engine hook that frees device memory, taken on release
    release_hook: Option<ReleaseHook>,
}

impl Tensor {
    /// Create a host tensor from raw bytes
    pub fn from_bytes(data: Vec<u8>, dtype: DType, shape: Vec<usize>) -> Result<Self> {
        let expected = shape.iter().product::<usize>() * dtype.size_of();
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                got: data.len(),
            });
        }

        Ok(Self {
            data,
            dtype,
            shape,
            location: Location::Host,
            release_hook: None,
        })
    }

    /// Create an empty host tensor: a zero-length buffer when any dimension
    /// is zero, a zero-filled buffer otherwise
    pub fn empty(dtype: DType, shape: Vec<usize>) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            data: vec![0u8; numel * dtype.size_of()],
            dtype,
            shape,
            location: Location::Host,
            release_hook: None,
        }
    }

    /// Create an int64 host tensor (token ids, masks, position ids)
    pub fn from_i64(values: &[i64], shape: Vec<usize>) -> Result<Self> {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(bytes, DType::I64, shape)
    }

    /// Create a float host tensor, converting to the requested dtype
    pub fn from_f32(values: &[f32], dtype: DType, shape: Vec<usize>) -> Result<Self> {
        let bytes = match dtype {
            DType::F32 => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            DType::F16 => values
                .iter()
                .flat_map(|&v| half::f16::from_f32(v).to_le_bytes())
                .collect(),
            DType::I64 => return Err(Error::UnsupportedDType(DType::I64.to_string())),
        };
        Self::from_bytes(bytes, dtype, shape)
    }

    /// Mark this tensor device-resident and attach the engine's release hook
    pub fn into_device(mut self, release_hook: impl FnOnce() + Send + 'static) -> Self {
        self.location = Location::Device;
        self.release_hook = Some(Box::new(release_hook));
        self
    }

    /// Get shape
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get dtype
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Backing-memory location
    pub fn location(&self) -> Location {
        self.location
    }

    /// Is the backing memory device-resident?
    pub fn is_device(&self) -> bool {
        self.location == Location::Device
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read the buffer back as f32, converting from the element type
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self.dtype {
            DType::F32 => self
                .data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            DType::F16 => self
                .data
                .chunks_exact(2)
                .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
            DType::I64 => self.to_i64_vec().iter().map(|&v| v as f32).collect(),
        }
    }

    /// Read the buffer back as i64
    pub fn to_i64_vec(&self) -> Vec<i64> {
        match self.dtype {
            DType::I64 => self
                .data
                .chunks_exact(8)
                .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
            _ => self.to_f32_vec().iter().map(|&v| v as i64).collect(),
        }
    }

    /// Free device memory through the engine hook. Runs the hook at most
    /// once; host tensors are unaffected.
    pub fn release(&mut self) {
        if let Some(hook) = self.release_hook.take() {
            hook();
        }
        self.data.clear();
    }
}

impl Drop for Tensor {
    fn drop(&mut self) {
        if let Some(hook) = self.release_hook.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("location", &self.location)
            .finish()
    }
}
