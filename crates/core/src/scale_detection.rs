//! Scale notation detection
//!
//! Finds metric plan ratios such as `1:100`, `Scale 1:50` or `Échelle 1/200`
//! in text extracted from a plan, so a page can be given a provisional scale
//! before the user calibrates it.

/// Denominators outside this range are not plan scales
const MAX_DENOMINATOR: f32 = 10_000.0;

/// Keywords that announce a scale notation
const KEYWORDS: [&str; 3] = ["scale", "échelle", "echelle"];

/// A `1:N` notation found in text
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedScale {
    /// Plan ratio denominator `N`
    pub ratio: f32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Notation as it appeared
    pub source_text: String,
    /// Byte offset of the notation in the searched text
    pub text_offset: usize,
}

/// Detect metric scale notations in `text`
///
/// Returns candidates sorted by confidence (highest first), one per distinct
/// ratio. Notations on a line that also carries a scale keyword rank higher
/// than bare ratios.
pub fn detect_scale_notation(text: &str) -> Vec<DetectedScale> {
    let mut detections: Vec<DetectedScale> = Vec::new();
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let lower = line.to_lowercase();
        let keyword = KEYWORDS.iter().any(|k| lower.contains(k));

        for (idx, _) in line.match_indices('1') {
            if let Some(found) = parse_notation(line, idx, keyword) {
                let found = DetectedScale {
                    text_offset: line_start + idx,
                    ..found
                };
                match detections.iter_mut().find(|d| d.ratio == found.ratio) {
                    Some(existing) if existing.confidence < found.confidence => *existing = found,
                    Some(_) => {}
                    None => detections.push(found),
                }
            }
        }
        line_start += line.len();
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    detections
}

/// Highest-confidence notation in `text`
pub fn best_scale_notation(text: &str) -> Option<DetectedScale> {
    detect_scale_notation(text).into_iter().next()
}

/// Parse `1:N` or `1/N` starting at byte `idx` of `line`
fn parse_notation(line: &str, idx: usize, keyword: bool) -> Option<DetectedScale> {
    // "11:50" or "x1:50" are not notations
    if line[..idx].chars().next_back().is_some_and(|c| c.is_alphanumeric() || c == '.') {
        return None;
    }

    let rest = &line[idx + 1..];
    let rest = rest.trim_start_matches(' ');
    let separator = rest.chars().next()?;
    if separator != ':' && separator != '/' {
        return None;
    }
    let digits_part = rest[separator.len_utf8()..].trim_start_matches(' ');
    let end = digits_part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits_part.len());
    let digits = &digits_part[..end];
    if digits.is_empty() {
        return None;
    }
    // "1/2.5" is a fraction, not a ratio
    if digits_part[end..].starts_with(&['.', ','][..]) {
        return None;
    }

    let ratio: f32 = digits.parse().ok()?;
    if !(ratio > 1.0 && ratio <= MAX_DENOMINATOR) {
        return None;
    }

    // bare slashes are more often dates or fractions than scales
    let confidence = match (keyword, separator) {
        (true, ':') => 0.95,
        (true, _) => 0.85,
        (false, ':') => 0.7,
        (false, _) => 0.4,
    };

    Some(DetectedScale {
        ratio,
        confidence,
        source_text: format!("1{separator}{digits}"),
        text_offset: idx,
    })
}
