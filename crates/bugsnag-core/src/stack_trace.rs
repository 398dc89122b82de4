//! Stack trace projection for error-report payloads.
//!
//! A [`StackTrace`] holds a snapshot of raw frames taken when it is built and
//! projects them on demand into [`StackTraceLine`]s, the serializable
//! per-frame records of the payload. Frames whose method could not be
//! resolved are left out of the projection.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Constants & Regex Patterns
// ─────────────────────────────────────────────────────────────────────────────

/// File name reported when a frame has no source location
pub const UNKNOWN_FILE: &str = "<unknown>";

/// Line number reported when a frame has no line information
pub const UNKNOWN_LINE_NUMBER: u32 = 0;

/// Field names owned by the typed part of [`StackTraceLine`]
pub const RESERVED_FIELDS: [&str; 4] = ["file", "lineNumber", "method", "inProject"];

/// Function that marks the end of the capture machinery in a live trace
const CAPTURE_MARKER: &str = "bugsnag_core::stack_trace::StackTrace::capture";

/// Matches the hash suffix of legacy-mangled Rust symbols: `::h0123456789abcdef`
static HASH_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::h[0-9a-f]{16}$").expect("Invalid HASH_SUFFIX_REGEX"));

/// Matches a numbered frame of a rendered std backtrace: `  12: app::main`
/// Captures: 1=symbol
static STD_FRAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+:\s+(.+?)\s*$").expect("Invalid STD_FRAME_REGEX"));

/// Matches the location line under a frame: `      at ./src/main.rs:10:5`
/// Line and column are absent when debug info only knows the file.
/// Captures: 1=file, 2=line (optional), 3=column (optional)
static STD_LOCATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(.+?)(?::(\d+)(?::(\d+))?)?\s*$")
        .expect("Invalid STD_LOCATION_REGEX")
});

/// Matches an un-numbered inlined symbol under a frame: `      core::ops::function::FnOnce::call_once`
/// Captures: 1=symbol
static STD_INLINED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{2,}(\S.*?)\s*$").expect("Invalid STD_INLINED_REGEX"));

// ─────────────────────────────────────────────────────────────────────────────
// Raw Frames
// ─────────────────────────────────────────────────────────────────────────────

/// One level of a captured call stack, as supplied by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    /// Resolved (demangled) symbol name; `None` when resolution failed
    pub method: Option<String>,

    /// Source file, when debug info provides one
    pub file: Option<String>,

    /// Source line (1-based), when debug info provides one
    pub line: Option<u32>,
}

impl RawFrame {
    /// A frame whose method was resolved
    pub fn resolved(method: impl Into<String>, file: Option<String>, line: Option<u32>) -> Self {
        Self {
            method: Some(method.into()),
            file,
            line,
        }
    }

    /// A frame the runtime could not resolve to a method
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.method.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stack Trace Lines
// ─────────────────────────────────────────────────────────────────────────────

/// A normalized, serializable projection of one resolved frame.
///
/// The four well-known fields are typed; classification code may attach
/// further named fields, which are serialized alongside them in one flat
/// object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceLine {
    /// Source file, or [`UNKNOWN_FILE`]
    pub file: String,

    /// Source line, or [`UNKNOWN_LINE_NUMBER`]
    pub line_number: u32,

    /// Friendly method signature (see [`friendly_method_name`])
    pub method: String,

    /// Whether the frame belongs to the reporting application's own code
    #[serde(default)]
    pub in_project: bool,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl StackTraceLine {
    pub fn new(file: impl Into<String>, line_number: u32, method: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line_number,
            method: method.into(),
            in_project: false,
            extra: Map::new(),
        }
    }

    /// Project a raw frame. Returns `None` for unresolved frames.
    pub fn from_frame(frame: &RawFrame) -> Option<Self> {
        let method = frame.method.as_deref()?;

        Some(Self::new(
            frame.file.as_deref().unwrap_or(UNKNOWN_FILE),
            frame.line.unwrap_or(UNKNOWN_LINE_NUMBER),
            friendly_method_name(method),
        ))
    }

    /// Attach an extra named field.
    ///
    /// Returns `false` (and leaves the line untouched) when `name` is one of
    /// [`RESERVED_FIELDS`]; use the typed fields for those.
    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        if RESERVED_FIELDS.contains(&name.as_str()) {
            tracing::warn!("Ignoring extra stack trace field '{}': name is reserved", name);
            return false;
        }
        self.extra.insert(name, value.into());
        true
    }

    /// Look up an extra field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.extra.remove(name)
    }

    /// Extra fields attached beyond the four typed ones
    pub fn extra_fields(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Render as one flat JSON object
    pub fn to_fragment(&self) -> Value {
        let mut object = Map::with_capacity(RESERVED_FIELDS.len() + self.extra.len());
        for (key, value) in &self.extra {
            object.insert(key.clone(), value.clone());
        }
        object.insert("file".to_string(), Value::from(self.file.as_str()));
        object.insert("lineNumber".to_string(), Value::from(self.line_number));
        object.insert("method".to_string(), Value::from(self.method.as_str()));
        object.insert("inProject".to_string(), Value::from(self.in_project));
        Value::Object(object)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stack Trace
// ─────────────────────────────────────────────────────────────────────────────

/// The stack of one reported error, innermost frame first.
///
/// The frame list is fixed at construction, so every call to [`lines`]
/// yields the same sequence.
///
/// [`lines`]: StackTrace::lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTrace {
    frames: Vec<RawFrame>,
}

impl StackTrace {
    /// Build from an already-captured frame list (innermost first)
    pub fn from_frames(frames: Vec<RawFrame>) -> Self {
        Self { frames }
    }

    /// Capture the calling thread's stack.
    ///
    /// Frames belonging to the capture itself are dropped, so the first line
    /// is the caller of this function.
    #[inline(never)]
    pub fn capture() -> Self {
        let backtrace = backtrace::Backtrace::new();
        let frames = trim_capture_frames(frames_from_backtrace(&backtrace));
        tracing::trace!("Captured {} stack frames", frames.len());
        Self { frames }
    }

    /// Build from a trace captured earlier with the `backtrace` crate.
    ///
    /// Unresolved traces are resolved on a copy; the argument is not modified.
    pub fn from_backtrace(backtrace: &backtrace::Backtrace) -> Self {
        let mut resolved = backtrace.clone();
        resolved.resolve();
        Self {
            frames: frames_from_backtrace(&resolved),
        }
    }

    /// Build from a std backtrace, as carried by error values.
    ///
    /// Disabled or unsupported backtraces produce an empty trace.
    pub fn from_std_backtrace(backtrace: &std::backtrace::Backtrace) -> Self {
        if backtrace.status() != std::backtrace::BacktraceStatus::Captured {
            return Self::default();
        }
        Self::parse(&backtrace.to_string())
    }

    /// Parse the textual rendering of a std backtrace.
    ///
    /// Lines that are neither frames nor locations are ignored. Frames
    /// rendered as `<unknown>` become unresolved frames.
    pub fn parse(raw: &str) -> Self {
        let mut frames: Vec<RawFrame> = Vec::new();

        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = STD_FRAME_REGEX.captures(line) {
                frames.push(frame_for_symbol(&caps[1]));
                continue;
            }

            if let Some(caps) = STD_LOCATION_REGEX.captures(line) {
                // A location before any frame has nothing to attach to
                if let Some(frame) = frames.last_mut() {
                    frame.file = Some(caps[1].to_string());
                    frame.line = caps.get(2).and_then(|m| m.as_str().parse().ok());
                }
                continue;
            }

            // Inlined symbols only appear inside a trace, never before it
            if !frames.is_empty() && !line.trim_start().starts_with("note:") {
                if let Some(caps) = STD_INLINED_REGEX.captures(line) {
                    frames.push(frame_for_symbol(&caps[1]));
                }
            }
        }

        Self { frames }
    }

    /// Project the frames into payload lines, lazily.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            frames: self.frames.iter(),
        }
    }

    /// Raw frames captured at construction, including unresolved ones
    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    /// Number of raw frames, including unresolved ones
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Render as the stack trace fragment of a report payload
    pub fn to_fragment(&self) -> Value {
        Value::Array(self.lines().map(|line| line.to_fragment()).collect())
    }
}

impl Serialize for StackTrace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.lines())
    }
}

impl<'a> IntoIterator for &'a StackTrace {
    type Item = StackTraceLine;
    type IntoIter = Lines<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines()
    }
}

/// Lazy iterator over the lines of a [`StackTrace`]
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    frames: std::slice::Iter<'a, RawFrame>,
}

impl Iterator for Lines<'_> {
    type Item = StackTraceLine;

    fn next(&mut self) -> Option<Self::Item> {
        for frame in self.frames.by_ref() {
            match StackTraceLine::from_frame(frame) {
                Some(line) => return Some(line),
                None => tracing::trace!("Skipping unresolved stack frame {:?}", frame),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.frames.len()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Render a demangled symbol as a stable, display-friendly method signature.
///
/// - The `::h<16 hex>` hash suffix is removed.
/// - Inside generic argument lists and trait positions, each type path is
///   shortened to its last segment.
/// - The Self type of a leading qualified path keeps its full path, so the
///   declaring module stays visible for project classification.
///
/// Examples:
/// - `app::orders::Checkout<alloc::string::String>::submit::h0123456789abcdef`
///   -> `app::orders::Checkout<String>::submit`
/// - `<app::Money as core::fmt::Display>::fmt` -> `<app::Money as Display>::fmt`
pub fn friendly_method_name(symbol: &str) -> String {
    let symbol = HASH_SUFFIX_REGEX.replace(symbol.trim(), "");
    let chars: Vec<char> = symbol.chars().collect();

    let Some(close) = chars
        .first()
        .filter(|&&c| c == '<')
        .and_then(|_| matching_close(&chars))
    else {
        return simplify_paths(&chars, 0);
    };

    // `<Self as Trait>::rest` or `<Self>::rest`
    let inner = &chars[1..close];
    let mut out = String::with_capacity(chars.len());
    out.push('<');
    match find_top_level_as(inner) {
        Some(split) => {
            out.push_str(&simplify_paths(&inner[..split], 0));
            out.push_str(" as ");
            out.push_str(&simplify_paths(&inner[split + 4..], 1));
        }
        None => out.push_str(&simplify_paths(inner, 0)),
    }
    out.push('>');
    out.push_str(&simplify_paths(&chars[close + 1..], 0));
    out
}

/// Shorten type paths nested deeper than `base_depth` generic levels to their
/// last segment. Paths at depth 0 are kept whole.
fn simplify_paths(chars: &[char], base_depth: usize) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut depth = base_depth;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if is_ident_char(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let continues_path = chars.get(i) == Some(&':')
                && chars.get(i + 1) == Some(&':')
                && chars.get(i + 2).is_some_and(|&c| is_ident_char(c));

            if depth > 0 && continues_path {
                // Drop the leading path segment and its separator
                i += 2;
            } else {
                out.extend(&chars[start..i]);
            }
            continue;
        }

        match c {
            '-' if chars.get(i + 1) == Some(&'>') => {
                out.push_str("->");
                i += 2;
                continue;
            }
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ => {}
        }
        out.push(c);
        i += 1;
    }

    out
}

/// Index of the `>` closing the `<` at index 0
fn matching_close(chars: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '-' if chars.get(i + 1) == Some(&'>') => i += 1,
            '<' => depth += 1,
            '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the ` as ` separating Self from the trait, outside nested generics
fn find_top_level_as(chars: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '-' if chars.get(i + 1) == Some(&'>') => i += 1,
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ' ' if depth == 0 && chars[i..].starts_with(&[' ', 'a', 's', ' ']) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn frame_for_symbol(symbol: &str) -> RawFrame {
    if symbol == UNKNOWN_FILE {
        RawFrame::unresolved()
    } else {
        RawFrame::resolved(symbol, None, None)
    }
}

/// Flatten a `backtrace` trace into raw frames, one per symbol.
///
/// Inlined calls resolve to several symbols for one instruction pointer and
/// become consecutive frames, innermost first.
fn frames_from_backtrace(backtrace: &backtrace::Backtrace) -> Vec<RawFrame> {
    let mut frames = Vec::new();

    for frame in backtrace.frames() {
        let symbols = frame.symbols();
        if symbols.is_empty() {
            frames.push(RawFrame::unresolved());
            continue;
        }

        for symbol in symbols {
            frames.push(RawFrame {
                method: symbol.name().map(|name| name.to_string()),
                file: symbol.filename().map(|path| path.display().to_string()),
                line: symbol.lineno(),
            });
        }
    }

    frames
}

/// Drop the frames of the capture machinery from the top of a live trace.
fn trim_capture_frames(frames: Vec<RawFrame>) -> Vec<RawFrame> {
    let marker = frames.iter().rposition(|frame| {
        frame
            .method
            .as_deref()
            .is_some_and(|method| method.contains(CAPTURE_MARKER))
    });

    match marker {
        Some(index) => frames.into_iter().skip(index + 1).collect(),
        None => {
            // Only the leading run of backtrace internals (and unresolved
            // frames between them) is dropped; a trace without any keeps all
            // of its frames.
            let cut = frames
                .iter()
                .take_while(|frame| {
                    frame
                        .method
                        .as_deref()
                        .map_or(true, |method| method.starts_with("backtrace::"))
                })
                .enumerate()
                .filter(|(_, frame)| frame.is_resolved())
                .last()
                .map_or(0, |(index, _)| index + 1);
            frames.into_iter().skip(cut).collect()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
