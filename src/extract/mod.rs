//! Field extraction strategies.
//!
//! All strategies share one contract: a text goes in, and either an
//! [`Extraction`] or nothing comes out. They differ only in how forgiving they
//! are and whether a language model is involved.

pub mod model;
pub mod template;

use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

use crate::schema::Extraction;

pub use self::model::{parse_model_response, ModelExtractor};
pub use self::template::{extract_lenient, extract_strict};

/// Which strategy to run, as selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExtractionMode {
    Strict,
    Lenient,
    Model,
}

impl FromStr for ExtractionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ExtractionMode::Strict),
            "lenient" => Ok(ExtractionMode::Lenient),
            "model" | "llm" => Ok(ExtractionMode::Model),
            other => Err(anyhow!(
                "Unknown extraction mode '{}', expected strict, lenient or model",
                other
            )),
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionMode::Strict => "strict",
            ExtractionMode::Lenient => "lenient",
            ExtractionMode::Model => "model",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub enum ExtractionStrategy {
    Strict,
    Lenient,
    Model(ModelExtractor),
}

impl ExtractionStrategy {
    pub fn mode(&self) -> ExtractionMode {
        match self {
            ExtractionStrategy::Strict => ExtractionMode::Strict,
            ExtractionStrategy::Lenient => ExtractionMode::Lenient,
            ExtractionStrategy::Model(_) => ExtractionMode::Model,
        }
    }

    pub async fn extract(&self, text: &str) -> Option<Extraction> {
        if text.trim().is_empty() {
            return None;
        }

        match self {
            ExtractionStrategy::Strict => extract_strict(text),
            ExtractionStrategy::Lenient => extract_lenient(text),
            ExtractionStrategy::Model(extractor) => extractor.extract(text).await,
        }
    }
}
