//! Splitting strings around account and region occurrences.
//!
//! Both the literal rewriter and the join normalizer need to cut a string
//! into literal text and pseudo-parameter pieces. They differ only in what
//! they search for: the detected literal values, or the `${AWS::...}`
//! placeholder tokens left behind by an earlier substitution.

use serde_json::Value;

use crate::intrinsic::{self, ACCOUNT_ID, REGION};

/// A pseudo-parameter the rewriter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    Region,
}

impl Pseudo {
    pub fn parameter(self) -> &'static str {
        match self {
            Pseudo::AccountId => ACCOUNT_ID,
            Pseudo::Region => REGION,
        }
    }

    /// The `${AWS::...}` token used inside substitution templates.
    pub fn placeholder(self) -> &'static str {
        match self {
            Pseudo::AccountId => "${AWS::AccountId}",
            Pseudo::Region => "${AWS::Region}",
        }
    }

    pub fn reference(self) -> Value {
        intrinsic::reference(self.parameter())
    }
}

/// One piece of a split string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Pseudo(Pseudo),
}

/// A search string and the pseudo-parameter it stands for.
pub type Needle<'a> = (&'a str, Pseudo);

/// Needles matching the placeholder tokens themselves.
pub fn placeholder_needles() -> [Needle<'static>; 2] {
    [
        (Pseudo::AccountId.placeholder(), Pseudo::AccountId),
        (Pseudo::Region.placeholder(), Pseudo::Region),
    ]
}

/// Whether `text` contains any of the needles.
pub fn contains_any(text: &str, needles: &[Needle<'_>]) -> bool {
    needles
        .iter()
        .any(|(needle, _)| find_needle(text, 0, needle).is_some())
}

/// Byte offset of the first occurrence of `needle` at or after `from`.
///
/// A needle made only of digits never matches inside a longer digit run,
/// so `123456789012` is not found in `1234567890123`.
fn find_needle(text: &str, from: usize, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let numeric = needle.bytes().all(|b| b.is_ascii_digit());
    let bytes = text.as_bytes();
    let mut start = from;

    while let Some(found) = text[start..].find(needle) {
        let at = start + found;
        let end = at + needle.len();
        let touches_digit = (at > 0 && bytes[at - 1].is_ascii_digit())
            || bytes.get(end).is_some_and(u8::is_ascii_digit);
        if !numeric || !touches_digit {
            return Some(at);
        }
        start = at + 1;
    }
    None
}

/// Split `text` at every needle occurrence, scanning left to right.
///
/// At each step the earliest occurrence of any needle wins; when two
/// needles start at the same offset the longer one is taken.
pub fn split(text: &str, needles: &[Needle<'_>]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    loop {
        let next = needles
            .iter()
            .filter_map(|&(needle, pseudo)| {
                find_needle(text, cursor, needle).map(|at| (at, needle.len(), pseudo))
            })
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let Some((at, len, pseudo)) = next else {
            if cursor < text.len() {
                segments.push(Segment::Literal(text[cursor..].to_string()));
            }
            break;
        };

        if at > cursor {
            segments.push(Segment::Literal(text[cursor..at].to_string()));
        }
        segments.push(Segment::Pseudo(pseudo));
        cursor = at + len;
    }

    segments
}

/// Whether any segment is a pseudo-parameter.
pub fn has_pseudo(segments: &[Segment]) -> bool {
    segments.iter().any(|s| matches!(s, Segment::Pseudo(_)))
}

/// Render segments as `Fn::Join` parts: strings and `Ref` objects.
pub fn to_join_parts(segments: &[Segment]) -> Vec<Value> {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => Value::String(text.clone()),
            Segment::Pseudo(pseudo) => pseudo.reference(),
        })
        .collect()
}

/// Render segments as a substitution template.
///
/// With `escape` set, `${` already present in literal text becomes `${!`
/// so a freshly wrapped `Fn::Sub` leaves it alone.
pub fn to_sub_template(segments: &[Segment], escape: bool) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) if escape => text.replace("${", "${!"),
            Segment::Literal(text) => text.clone(),
            Segment::Pseudo(pseudo) => pseudo.placeholder().to_string(),
        })
        .collect()
}
