//! Assembly of the metadata and stack trace fragments of one report.

use bugsnag_core::{Metadata, StackTrace, StackTraceLine};
use serde::Serialize;
use serde_json::Value;

use crate::classify::classify_trace;
use crate::config::Configuration;

/// The payload fragments produced for one error report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFragments {
    /// Merged metadata: tab → key → value
    pub meta_data: Metadata,

    /// Classified stack trace lines, innermost first
    pub stacktrace: Vec<StackTraceLine>,
}

impl ReportFragments {
    /// Render as a JSON object with `metaData` and `stacktrace` members
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::with_capacity(2);
        object.insert("metaData".to_string(), self.meta_data.to_fragment());
        object.insert(
            "stacktrace".to_string(),
            Value::Array(self.stacktrace.iter().map(StackTraceLine::to_fragment).collect()),
        );
        Value::Object(object)
    }
}

/// Collects the inputs of one report and produces its fragments.
///
/// Metadata sources are ranked in the order they are added: the first source
/// wins on conflicting entries. The configuration's global metadata always
/// ranks last.
#[derive(Debug)]
pub struct FragmentBuilder<'a> {
    config: &'a Configuration,
    metadata: Vec<&'a Metadata>,
    stack_trace: Option<&'a StackTrace>,
}

impl<'a> FragmentBuilder<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            metadata: Vec::new(),
            stack_trace: None,
        }
    }

    /// Add a metadata source, ranked below those already added
    pub fn metadata(mut self, metadata: &'a Metadata) -> Self {
        self.metadata.push(metadata);
        self
    }

    /// Set the stack trace of the reported error
    pub fn stack_trace(mut self, stack_trace: &'a StackTrace) -> Self {
        self.stack_trace = Some(stack_trace);
        self
    }

    pub fn build(self) -> ReportFragments {
        let globals = self.config.global_metadata();
        let mut sources: Vec<&Metadata> = self.metadata.clone();
        sources.push(&globals);

        let meta_data = Metadata::merge(sources);

        let stacktrace = match self.stack_trace {
            Some(trace) => classify_trace(trace, &self.config.project_config()),
            None => Vec::new(),
        };

        tracing::debug!(
            "Built report fragments: {} metadata tabs, {} stack trace lines",
            meta_data.len(),
            stacktrace.len()
        );

        ReportFragments {
            meta_data,
            stacktrace,
        }
    }
}
