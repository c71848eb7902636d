use crate::config::ExtractMode;

/// Shape of an embedded JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Object,
    Array,
}

impl JsonKind {
    fn from_opener(byte: u8) -> Option<Self> {
        match byte {
            b'{' => Some(JsonKind::Object),
            b'[' => Some(JsonKind::Array),
            _ => None,
        }
    }
}

/// Half-open byte span `[start, end)` of the JSON value inside a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonRegion {
    pub start: usize,
    pub end: usize,
    pub kind: JsonKind,
}

impl JsonRegion {
    /// The region's text, without line-ending normalization.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Extract the embedded JSON text using the default heuristic.
///
/// Returns an empty string when the reply holds no object or array.
pub fn extract(text: &str) -> String {
    extract_with(text, ExtractMode::default())
}

/// Extract the embedded JSON text, normalizing `\r\n` to `\n`.
pub fn extract_with(text: &str, mode: ExtractMode) -> String {
    match locate(text, mode) {
        Some(region) => region.slice(text).replace("\r\n", "\n"),
        None => String::new(),
    }
}

/// Locate the embedded JSON region.
pub fn locate(text: &str, mode: ExtractMode) -> Option<JsonRegion> {
    match mode {
        ExtractMode::Heuristic => locate_heuristic(text),
        ExtractMode::Balanced => locate_balanced(text),
    }
}

fn locate_heuristic(text: &str) -> Option<JsonRegion> {
    let object = candidate(text, '{', '}');
    let array = candidate(text, '[', ']');

    let (start, close, kind) = match (object, array) {
        (Some(obj), Some(arr)) if arr.0 < obj.0 => (arr.0, arr.1, JsonKind::Array),
        (Some(obj), _) => (obj.0, obj.1, JsonKind::Object),
        (None, Some(arr)) => (arr.0, arr.1, JsonKind::Array),
        (None, None) => return None,
    };

    // Delimiters are ASCII, so `close + 1` is a char boundary.
    Some(JsonRegion {
        start,
        end: close + 1,
        kind,
    })
}

/// First `open` and last `close`, valid only when the close follows the open.
fn candidate(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then_some((start, end))
}

fn locate_balanced(text: &str) -> Option<JsonRegion> {
    let bytes = text.as_bytes();
    let mut from = 0usize;

    while let Some(offset) = bytes[from..].iter().position(|b| matches!(b, b'{' | b'[')) {
        let start = from + offset;
        if let Some(end) = balanced_end(bytes, start) {
            let kind = JsonKind::from_opener(bytes[start])?;
            return Some(JsonRegion { start, end, kind });
        }
        from = start + 1;
    }

    None
}

/// Exclusive end of the value opened at `start`, or `None` if it never
/// closes or closes with the wrong delimiter.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut expected: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => expected.push(b'}'),
            b'[' => expected.push(b']'),
            b'}' | b']' => {
                if expected.pop() != Some(b) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_empty() {
        assert_eq!(extract(""), "");
        assert_eq!(locate("", ExtractMode::Heuristic), None);
        assert_eq!(locate("", ExtractMode::Balanced), None);
    }

    #[test]
    fn object_inside_prose() {
        assert_eq!(extract(r#"prefix {"a":1} suffix"#), r#"{"a":1}"#);
    }

    #[test]
    fn array_inside_prose() {
        assert_eq!(extract("prefix [1,2,3] suffix"), "[1,2,3]");
    }

    #[test]
    fn earlier_object_beats_later_array() {
        let text = r#"a{ {"x":1} }b [1]"#;
        let region = locate(text, ExtractMode::Heuristic).unwrap();
        assert_eq!(region.kind, JsonKind::Object);
        assert_eq!((region.start, region.end), (1, 12));
        assert_eq!(extract(text), r#"{ {"x":1} }"#);
    }

    #[test]
    fn earlier_array_beats_later_object() {
        let text = r#"list: [{"id":1},{"id":2}] done"#;
        let region = locate(text, ExtractMode::Heuristic).unwrap();
        assert_eq!(region.kind, JsonKind::Array);
        assert_eq!(extract(text), r#"[{"id":1},{"id":2}]"#);
    }

    #[test]
    fn heuristic_spans_to_last_closer() {
        let text = r#"x {"a":1} y {"b":2} z"#;
        assert_eq!(extract(text), r#"{"a":1} y {"b":2}"#);
    }

    #[test]
    fn close_before_open_is_not_a_candidate() {
        assert_eq!(extract("} then {"), "");
        assert_eq!(extract("] then ["), "");
        // Only the array qualifies here.
        assert_eq!(extract("} [1] {"), "[1]");
    }

    #[test]
    fn lone_delimiters_yield_empty() {
        assert_eq!(extract("{"), "");
        assert_eq!(extract("no json here"), "");
        assert_eq!(extract("]"), "");
    }

    #[test]
    fn crlf_normalized_inside_region() {
        let text = "reply:\r\n{\r\n  \"a\": 1,\r\n  \"b\": 2\r\n}\r\n";
        assert_eq!(extract(text), "{\n  \"a\": 1,\n  \"b\": 2\n}");
    }

    #[test]
    fn lone_cr_is_left_alone() {
        assert_eq!(extract("{\"a\":\r1}"), "{\"a\":\r1}");
    }

    #[test]
    fn multibyte_prose_around_json() {
        let text = "résumé → {\"ü\":1} ←";
        assert_eq!(extract(text), "{\"ü\":1}");
    }

    #[test]
    fn balanced_stops_at_first_complete_value() {
        let text = r#"x {"a":1} y {"b":2} z"#;
        assert_eq!(extract_with(text, ExtractMode::Balanced), r#"{"a":1}"#);
    }

    #[test]
    fn balanced_ignores_delimiters_in_strings() {
        let text = r#"{"s":"} \" ]"} tail }"#;
        assert_eq!(extract(text), text);
        assert_eq!(
            extract_with(text, ExtractMode::Balanced),
            r#"{"s":"} \" ]"}"#
        );
    }

    #[test]
    fn balanced_skips_unclosed_opener() {
        let text = r#"menu [choose one: {"pick":[1,2]}"#;
        let region = locate(text, ExtractMode::Balanced).unwrap();
        assert_eq!(region.kind, JsonKind::Object);
        assert_eq!(region.slice(text), r#"{"pick":[1,2]}"#);
    }

    #[test]
    fn balanced_rejects_mismatched_closer() {
        assert_eq!(extract_with("{ ] }", ExtractMode::Balanced), "");
        assert_eq!(extract_with("[ { ] ]", ExtractMode::Balanced), "");
    }

    #[test]
    fn balanced_matches_heuristic_for_single_value() {
        let text = "count\r\n{\"count\":10}\r\n";
        assert_eq!(
            extract_with(text, ExtractMode::Balanced),
            extract_with(text, ExtractMode::Heuristic)
        );
    }

    #[test]
    fn region_len() {
        let region = locate("ab[1]", ExtractMode::Heuristic).unwrap();
        assert_eq!(region.len(), 3);
        assert!(!region.is_empty());
    }
}
