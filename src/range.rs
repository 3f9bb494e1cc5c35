//! Chapter range expressions such as `120`, `100:140` or `1,5:7,20:`.

use serde::Serialize;

use crate::ManganeseError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChapterRange {
    Chapter(f32),
    /// Missing bounds are open.
    Span { from: Option<f32>, to: Option<f32> },
}

impl ChapterRange {
    pub fn contains(&self, chapter: f32) -> bool {
        match *self {
            ChapterRange::Chapter(c) => c == chapter,
            ChapterRange::Span { from, to } => {
                chapter >= from.unwrap_or(f32::NEG_INFINITY) && chapter <= to.unwrap_or(f32::INFINITY)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RangeSpec(Vec<ChapterRange>);

impl RangeSpec {
    pub fn ranges(&self) -> &[ChapterRange] {
        &self.0
    }

    pub fn contains(&self, chapter: f32) -> bool {
        self.0.iter().any(|r| r.contains(chapter))
    }
}

impl From<Vec<ChapterRange>> for RangeSpec {
    fn from(ranges: Vec<ChapterRange>) -> Self {
        Self(ranges)
    }
}

pub fn parse(expression: &str) -> Result<RangeSpec, ManganeseError> {
    let invalid = || ManganeseError::RangeParseError(expression.to_string());

    let bound = |raw: &str| -> Result<Option<f32>, ManganeseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<f32>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(invalid()),
        }
    };

    let mut ranges = Vec::new();
    for segment in expression.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(invalid());
        }
        let range = match segment.split_once(':') {
            Some((from, to)) => {
                let (from, to) = (bound(from)?, bound(to)?);
                if let (Some(from), Some(to)) = (from, to) {
                    if from > to {
                        return Err(invalid());
                    }
                }
                ChapterRange::Span { from, to }
            }
            None => ChapterRange::Chapter(bound(segment)?.ok_or_else(invalid)?),
        };
        ranges.push(range);
    }
    Ok(RangeSpec(ranges))
}
