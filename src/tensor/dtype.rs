//! Element types for feed and output tensors

use serde::{Deserialize, Serialize};

/// Element types the runtime materializes or reads back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// 32-bit floating point
    F32,
    /// 16-bit floating point (IEEE 754)
    F16,
    /// 64-bit signed integer (token ids, masks, positions)
    I64,
}

impl DType {
    /// Size in bytes of a single element
    pub fn size_of(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I64 => 8,
        }
    }

    /// Is this a floating point type?
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F16)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(DType::F32.size_of(), 4);
        assert_eq!(DType::F16.size_of(), 2);
        assert_eq!(DType::I64.size_of(), 8);
        assert!(DType::F16.is_float());
        assert!(!DType::I64.is_float());
    }
}
