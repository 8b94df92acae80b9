//! Workflow step taxonomy
//!
//! The pipeline has a fixed, closed set of eight stages. Each stage is stored
//! by its ordinal and its title/description are derived from it, never
//! supplied by callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// One of the eight canonical stages of the data-preparation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WorkflowStep {
    DataIngestion,
    NlpProcessing,
    DataTransformation,
    DataValidation,
    VectorEmbedding,
    PatternAnalysis,
    InsightGeneration,
    VisualizationPrep,
}

impl WorkflowStep {
    /// All steps in pipeline order
    pub const ALL: [WorkflowStep; 8] = [
        WorkflowStep::DataIngestion,
        WorkflowStep::NlpProcessing,
        WorkflowStep::DataTransformation,
        WorkflowStep::DataValidation,
        WorkflowStep::VectorEmbedding,
        WorkflowStep::PatternAnalysis,
        WorkflowStep::InsightGeneration,
        WorkflowStep::VisualizationPrep,
    ];

    /// 1-based position in the pipeline
    pub fn ordinal(self) -> u8 {
        match self {
            WorkflowStep::DataIngestion => 1,
            WorkflowStep::NlpProcessing => 2,
            WorkflowStep::DataTransformation => 3,
            WorkflowStep::DataValidation => 4,
            WorkflowStep::VectorEmbedding => 5,
            WorkflowStep::PatternAnalysis => 6,
            WorkflowStep::InsightGeneration => 7,
            WorkflowStep::VisualizationPrep => 8,
        }
    }

    /// Persisted key, e.g. `DATA_INGESTION`
    pub fn key(self) -> &'static str {
        match self {
            WorkflowStep::DataIngestion => "DATA_INGESTION",
            WorkflowStep::NlpProcessing => "NLP_PROCESSING",
            WorkflowStep::DataTransformation => "DATA_TRANSFORMATION",
            WorkflowStep::DataValidation => "DATA_VALIDATION",
            WorkflowStep::VectorEmbedding => "VECTOR_EMBEDDING",
            WorkflowStep::PatternAnalysis => "PATTERN_ANALYSIS",
            WorkflowStep::InsightGeneration => "INSIGHT_GENERATION",
            WorkflowStep::VisualizationPrep => "VISUALIZATION_PREP",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WorkflowStep::DataIngestion => "Data Ingestion",
            WorkflowStep::NlpProcessing => "NLP Processing",
            WorkflowStep::DataTransformation => "Data Transformation",
            WorkflowStep::DataValidation => "Data Validation",
            WorkflowStep::VectorEmbedding => "Vector Embedding",
            WorkflowStep::PatternAnalysis => "Pattern Analysis",
            WorkflowStep::InsightGeneration => "Insight Generation",
            WorkflowStep::VisualizationPrep => "Visualization Preparation",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WorkflowStep::DataIngestion => "Uploading and parsing the source dataset",
            WorkflowStep::NlpProcessing => "Interpreting the natural-language request",
            WorkflowStep::DataTransformation => "Applying transformations to the dataset",
            WorkflowStep::DataValidation => "Validating the transformed data",
            WorkflowStep::VectorEmbedding => "Generating embeddings for similarity search",
            WorkflowStep::PatternAnalysis => "Detecting patterns and anomalies",
            WorkflowStep::InsightGeneration => "Generating AI insights from the analysis",
            WorkflowStep::VisualizationPrep => "Preparing data for dashboard visualizations",
        }
    }

    /// Look up a step by its ordinal
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.ordinal() == ordinal)
    }

    /// Parse a persisted step key, rejecting anything outside the taxonomy
    pub fn from_key(key: &str) -> Result<Self, TimelineError> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.key() == key)
            .ok_or_else(|| TimelineError::InvalidStep(key.to_string()))
    }
}

impl FromStr for WorkflowStep {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl From<WorkflowStep> for u8 {
    fn from(step: WorkflowStep) -> Self {
        step.ordinal()
    }
}

impl TryFrom<u8> for WorkflowStep {
    type Error = TimelineError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        Self::from_ordinal(ordinal).ok_or_else(|| TimelineError::InvalidStep(ordinal.to_string()))
    }
}

/// Taxonomy entry as exposed to API clients
#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
    pub step: u8,
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl From<WorkflowStep> for StepInfo {
    fn from(step: WorkflowStep) -> Self {
        Self {
            step: step.ordinal(),
            key: step.key(),
            title: step.title(),
            description: step.description(),
        }
    }
}
