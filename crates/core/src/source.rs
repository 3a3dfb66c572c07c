//! Source positions for compiler diagnostics.
//!
//! Every compile error carries a [`DebugInfo`] range so an external editor
//! can highlight the offending part of a rule script. Lines and columns are
//! 1-based; `index` is the 0-based byte offset into the script text.

use serde::{Deserialize, Serialize};

/// A single point in a rule script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineInfo {
    pub line: usize,
    pub column: usize,
    pub index: usize,
}

impl LineInfo {
    pub fn new(line: usize, column: usize, index: usize) -> Self {
        LineInfo {
            line,
            column,
            index,
        }
    }
}

/// A start/end range in a rule script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebugInfo {
    pub start: LineInfo,
    pub end: LineInfo,
}

impl DebugInfo {
    pub fn new(start: LineInfo, end: LineInfo) -> Self {
        DebugInfo { start, end }
    }

    /// A zero-width range at `at`.
    pub fn point(at: LineInfo) -> Self {
        DebugInfo { start: at, end: at }
    }
}

/// Maps byte offsets in a script to line/column positions and finds the
/// places where steps and expressions were written.
///
/// The YAML layer does not hand out node positions once a document is
/// deserialized, so semantic errors are located by searching the text for
/// the construct they are about.
pub struct SourceMap<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceMap { text, line_starts }
    }

    /// Position of a byte offset. Offsets past the end clamp to the end.
    pub fn position(&self, offset: usize) -> LineInfo {
        let offset = offset.min(self.text.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self
            .text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0)
            + 1;
        LineInfo::new(line_idx + 1, column, offset)
    }

    /// Range covering `len` bytes from `offset`.
    pub fn span(&self, offset: usize, len: usize) -> DebugInfo {
        DebugInfo::new(self.position(offset), self.position(offset + len))
    }

    /// Range from `offset` to the end of its line.
    pub fn line_span(&self, offset: usize) -> DebugInfo {
        let offset = offset.min(self.text.len());
        let end = self
            .text
            .get(offset..)
            .and_then(|rest| rest.find('\n'))
            .map(|i| offset + i)
            .unwrap_or(self.text.len());
        DebugInfo::new(self.position(offset), self.position(end))
    }

    /// Offset of the `id: <step_id>` entry declaring a step.
    pub fn locate_step(&self, step_id: &str) -> Option<usize> {
        self.locate_key_value("id", step_id, 0)
    }

    /// Offset of a `<key>: <value>` entry at or after `from`. The value may be
    /// quoted and the entry may open a sequence item (`- key: value`).
    pub fn locate_key_value(&self, key: &str, value: &str, from: usize) -> Option<usize> {
        let prefix = format!("{}:", key);
        for &start in self.line_starts.iter().filter(|&&s| s >= from) {
            let line = self.line_at(start);
            let indent = line.len() - line.trim_start().len();
            let mut rest = line.trim_start();
            let mut offset = start + indent;
            while let Some(stripped) = rest.strip_prefix("- ") {
                let trimmed = stripped.trim_start();
                offset += rest.len() - trimmed.len();
                rest = trimmed;
            }
            if let Some(v) = rest.strip_prefix(prefix.as_str()) {
                let v = v.trim().trim_matches(|c| c == '"' || c == '\'');
                if v == value {
                    return Some(offset);
                }
            }
        }
        None
    }

    /// Offset of `needle` at or after `from`.
    pub fn find(&self, needle: &str, from: usize) -> Option<usize> {
        let from = from.min(self.text.len());
        self.text.get(from..)?.find(needle).map(|i| from + i)
    }

    fn line_at(&self, start: usize) -> &'a str {
        let Some(rest) = self.text.get(start..) else {
            return "";
        };
        match rest.find('\n') {
            Some(end) => &rest[..end],
            None => rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "steps:\n  - id: first\n    choice: [a, b]\n  - id: \"second\"\n";

    #[test]
    fn position_of_first_byte() {
        let map = SourceMap::new(SCRIPT);
        assert_eq!(map.position(0), LineInfo::new(1, 1, 0));
    }

    #[test]
    fn position_on_later_line() {
        let map = SourceMap::new(SCRIPT);
        let offset = SCRIPT.find("choice").unwrap();
        let pos = map.position(offset);
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 5);
        assert_eq!(pos.index, offset);
    }

    #[test]
    fn locate_step_inside_sequence_item() {
        let map = SourceMap::new(SCRIPT);
        let offset = map.locate_step("first").unwrap();
        assert_eq!(&SCRIPT[offset..offset + 9], "id: first");
    }

    #[test]
    fn locate_step_with_quoted_id() {
        let map = SourceMap::new(SCRIPT);
        let offset = map.locate_step("second").unwrap();
        assert_eq!(map.position(offset).line, 4);
    }

    #[test]
    fn locate_missing_step() {
        let map = SourceMap::new(SCRIPT);
        assert!(map.locate_step("third").is_none());
    }

    #[test]
    fn line_span_stops_at_newline() {
        let map = SourceMap::new(SCRIPT);
        let span = map.line_span(0);
        assert_eq!(span.start.line, 1);
        assert_eq!(span.end.line, 1);
        assert_eq!(span.end.column, 7);
    }

    #[test]
    fn offsets_inside_a_character_do_not_panic() {
        let text = "steps:\n  - { id: één }\n";
        let map = SourceMap::new(text);
        let inside = text.find('é').unwrap() + 1;
        assert_eq!(map.find("id", inside), None);
        assert_eq!(map.line_span(inside).start.line, 2);
        assert_eq!(map.locate_key_value("id", "één", inside), None);
    }
}
