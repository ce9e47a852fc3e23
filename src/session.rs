//! Inference engine contract
//!
//! The runtime drives an opaque engine through these traits: the engine
//! turns a resolved artifact into a session, the session runs a computation
//! graph over a named tensor feed. Implementations (ONNX Runtime bindings,
//! test mocks) live outside this crate.

use std::collections::HashMap;

use crate::tensor::Tensor;
use crate::Result;

/// Named input tensors for a session run. The runtime owns this map
/// exclusively; cache slots are named `past_key_values.<layer>.key/.value`.
pub type Feed = HashMap<String, Tensor>;

/// Acceleration backends a caller may request, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    /// Portable CPU backend
    Cpu,
    /// XNNPACK (mobile CPU)
    XnnPack,
    /// Android NNAPI
    NnApi,
    /// Apple CoreML
    CoreMl,
    /// Qualcomm QNN
    Qnn,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionProvider::Cpu => "cpu",
            ExecutionProvider::XnnPack => "xnnpack",
            ExecutionProvider::NnApi => "nnapi",
            ExecutionProvider::CoreMl => "coreml",
            ExecutionProvider::Qnn => "qnn",
        };
        f.write_str(name)
    }
}

/// Graph optimization level requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOptimizationLevel {
    Disabled,
    Basic,
    Extended,
    All,
}

/// Options handed to the engine when creating a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Backends to request, in order
    pub execution_providers: Vec<ExecutionProvider>,
    /// Graph optimization level
    pub graph_optimization_level: GraphOptimizationLevel,
    /// Engine log severity, 0 = verbose
    pub log_severity_level: Option<u8>,
    /// Engine log verbosity
    pub log_verbosity_level: Option<u8>,
    /// Resolved paths of out-of-band weight artifacts
    pub external_data: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            execution_providers: Vec::new(),
            graph_optimization_level: GraphOptimizationLevel::All,
            log_severity_level: None,
            log_verbosity_level: None,
            external_data: Vec::new(),
        }
    }
}

/// Named output tensors of a session run.
///
/// An engine may declare an output it did not materialize for a step; such
/// an entry is present by name with no tensor, and the cache update treats
/// it as a request to clear the slot.
#[derive(Debug, Default)]
pub struct SessionOutputs {
    map: HashMap<String, Option<Tensor>>,
}

impl SessionOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a materialized output tensor
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.map.insert(name.into(), Some(tensor));
    }

    /// Declare an output name with no materialized tensor
    pub fn insert_missing(&mut self, name: impl Into<String>) {
        self.map.insert(name.into(), None);
    }

    /// Look up a materialized output by name
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.map.get(name).and_then(|t| t.as_ref())
    }

    /// Iterate over declared output names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|k| k.as_str())
    }

    /// Consume the outputs, yielding every declared entry
    pub fn into_entries(self) -> impl Iterator<Item = (String, Option<Tensor>)> {
        self.map.into_iter()
    }
}

/// A live computation-graph session
pub trait InferenceSession {
    /// Run the graph on the named inputs and return the named outputs
    fn run(&mut self, feed: &Feed) -> Result<SessionOutputs>;

    /// Release engine-side resources. Called exactly once by the runtime.
    fn release(&mut self) -> Result<()>;
}

/// Factory turning a resolved artifact into a session
pub trait InferenceEngine {
    /// Create a session from a local resource handle (path or URI).
    /// Fails if the engine rejects the artifact.
    fn create_session(
        &self,
        artifact: &str,
        options: &SessionOptions,
    ) -> Result<Box<dyn InferenceSession>>;
}
