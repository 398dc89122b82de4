//! Project classification of stack trace lines.
//!
//! Lines come out of the projector with `inProject = false`. Classification
//! runs afterwards against the configured lists:
//! - the first matching file prefix is stripped from `file`
//! - lines whose `method` lives under a project namespace are marked as
//!   project code

use bugsnag_core::{StackTrace, StackTraceLine};

/// Path separator of Rust symbol paths
const PATH_SEPARATOR: &str = "::";

/// Lists that decide which frames belong to the reporting application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Path prefixes stripped from file names (e.g., the build directory)
    pub file_prefixes: Vec<String>,

    /// Module paths of the application's own code (e.g., `shop`, `shop::api`)
    pub project_namespaces: Vec<String>,
}

impl ProjectConfig {
    pub fn new(file_prefixes: Vec<String>, project_namespaces: Vec<String>) -> Self {
        Self {
            file_prefixes,
            project_namespaces,
        }
    }

    /// Whether `method` is declared in one of the project namespaces.
    ///
    /// A namespace matches the method itself or anything below it: `shop`
    /// matches `shop::cart::add` but not `shopify::client`. A leading `<` of
    /// a qualified path is ignored.
    pub fn is_project_method(&self, method: &str) -> bool {
        let method = method.trim_start_matches('<');

        self.project_namespaces.iter().any(|namespace| {
            let namespace = namespace.trim();
            if namespace.is_empty() {
                return false;
            }
            if namespace.ends_with(PATH_SEPARATOR) {
                return method.starts_with(namespace);
            }
            method
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(PATH_SEPARATOR))
        })
    }

    /// `file` without the first matching prefix, or `None` if none matches
    pub fn strip_file_prefix<'a>(&self, file: &'a str) -> Option<&'a str> {
        self.file_prefixes
            .iter()
            .filter(|prefix| !prefix.is_empty())
            .find_map(|prefix| file.strip_prefix(prefix.as_str()))
    }
}

/// Classify one line against the project configuration.
///
/// `inProject` is only ever set, never cleared, so lines already marked by
/// another collaborator keep their flag.
pub fn classify(mut line: StackTraceLine, config: &ProjectConfig) -> StackTraceLine {
    if let Some(stripped) = config.strip_file_prefix(&line.file) {
        line.file = stripped.to_string();
    }

    if config.is_project_method(&line.method) {
        line.in_project = true;
    }

    line
}

/// Project and classify every line of a trace
pub fn classify_trace(trace: &StackTrace, config: &ProjectConfig) -> Vec<StackTraceLine> {
    let lines: Vec<StackTraceLine> = trace.lines().map(|line| classify(line, config)).collect();

    tracing::debug!(
        "Classified {} stack trace lines ({} in project)",
        lines.len(),
        lines.iter().filter(|line| line.in_project).count()
    );

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugsnag_core::RawFrame;

    fn config() -> ProjectConfig {
        ProjectConfig::new(
            vec!["/build/shop/".to_string(), "/build/".to_string()],
            vec!["shop".to_string(), "billing::".to_string()],
        )
    }

    #[test]
    fn test_is_project_method() {
        let config = config();

        assert!(config.is_project_method("shop"));
        assert!(config.is_project_method("shop::cart::Cart::add"));
        assert!(config.is_project_method("billing::invoice::render"));
        assert!(config.is_project_method("<shop::Money as Display>::fmt"));
        assert!(!config.is_project_method("shopify::client::get"));
        assert!(!config.is_project_method("core::option::Option<T>::unwrap"));
    }

    #[test]
    fn test_empty_namespace_matches_nothing() {
        let config = ProjectConfig::new(Vec::new(), vec![String::new(), " ".to_string()]);
        assert!(!config.is_project_method("shop::main"));
    }

    #[test]
    fn test_strip_file_prefix_uses_first_match() {
        let config = config();

        assert_eq!(
            config.strip_file_prefix("/build/shop/src/cart.rs"),
            Some("src/cart.rs")
        );
        assert_eq!(config.strip_file_prefix("/build/other/lib.rs"), Some("other/lib.rs"));
        assert_eq!(config.strip_file_prefix("/rustc/library/core.rs"), None);
    }

    #[test]
    fn test_classify_project_line() {
        let line = StackTraceLine::new("/build/shop/src/cart.rs", 10, "shop::cart::add");
        let line = classify(line, &config());

        assert_eq!(line.file, "src/cart.rs");
        assert!(line.in_project);
    }

    #[test]
    fn test_classify_third_party_line() {
        let line = StackTraceLine::new("/rustc/abc/library/std/src/rt.rs", 159, "std::rt::lang_start");
        let line = classify(line, &config());

        assert_eq!(line.file, "/rustc/abc/library/std/src/rt.rs");
        assert!(!line.in_project);
    }

    #[test]
    fn test_classify_never_clears_flag() {
        let mut line = StackTraceLine::new("vendor.rs", 1, "vendor::f");
        line.in_project = true;

        assert!(classify(line, &ProjectConfig::default()).in_project);
    }

    #[test]
    fn test_classify_keeps_extra_fields() {
        let mut line = StackTraceLine::new("/build/shop/src/a.rs", 1, "shop::a");
        line.insert_field("columnNumber", 3);

        let line = classify(line, &config());
        assert_eq!(line.field("columnNumber"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_classify_trace_trait_impl_frames() {
        let trace = StackTrace::from_frames(vec![
            RawFrame::resolved(
                "<shop::Money as core::fmt::Display>::fmt::h0123456789abcdef",
                Some("/build/shop/src/money.rs".into()),
                Some(21),
            ),
            RawFrame::resolved(
                "<shopify::Client as core::iter::traits::iterator::Iterator>::next",
                None,
                None,
            ),
            RawFrame::resolved("<core::fmt::Arguments as core::fmt::Display>::fmt", None, None),
        ]);

        let lines = classify_trace(&trace, &config());

        assert_eq!(lines[0].method, "<shop::Money as Display>::fmt");
        assert_eq!(lines[0].file, "src/money.rs");
        assert!(lines[0].in_project);
        assert!(!lines[1].in_project);
        assert!(!lines[2].in_project);
    }

    #[test]
    fn test_classify_trace() {
        let trace = StackTrace::from_frames(vec![
            RawFrame::resolved("shop::cart::add", Some("/build/shop/src/cart.rs".into()), Some(10)),
            RawFrame::unresolved(),
            RawFrame::resolved("std::rt::lang_start", None, None),
        ]);

        let lines = classify_trace(&trace, &config());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].in_project);
        assert!(!lines[1].in_project);
        assert_eq!(lines[1].file, "<unknown>");
    }
}
