//! File patterns describing a numbered image series.
//!
//! A pattern is literal text with `<...>` blocks. A block is either a
//! numeric range `<1-12>` (optionally with a step, `<0-30:10>`) or a list
//! `<red,green,blue>`. A range whose start carries leading zeros pads every
//! value to the start's width, so `<01-12>` yields `01` through `12`.

use std::fmt;

use thiserror::Error;

use crate::constants::MAX_PATTERN_FILES;

/// Errors from parsing a file pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Unterminated block in pattern '{pattern}'")]
    Unterminated { pattern: String },

    #[error("Empty block in pattern '{pattern}'")]
    EmptyBlock { pattern: String },

    #[error("Invalid range '<{block}>'")]
    BadRange { block: String },

    #[error("Zero step in range '<{block}>'")]
    ZeroStep { block: String },

    #[error("Pattern '{pattern}' expands to more than {limit} files")]
    TooManyFiles { pattern: String, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Block(Vec<String>),
}

/// A parsed file pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    source: String,
    segments: Vec<Segment>,
}

impl FilePattern {
    /// Parse a pattern, rejecting ones that expand to more than
    /// [`MAX_PATTERN_FILES`] names.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let too_many = || PatternError::TooManyFiles {
            pattern: pattern.to_string(),
            limit: MAX_PATTERN_FILES,
        };
        let mut segments = Vec::new();
        let mut count: usize = 1;
        let mut rest = pattern;

        while let Some(open) = rest.find('<') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('>').ok_or_else(|| PatternError::Unterminated {
                pattern: pattern.to_string(),
            })?;
            let block = &after[..close];
            if block.trim().is_empty() {
                return Err(PatternError::EmptyBlock {
                    pattern: pattern.to_string(),
                });
            }
            let values = parse_block(block).map_err(|e| match e {
                PatternError::TooManyFiles { .. } => too_many(),
                other => other,
            })?;
            count = count
                .checked_mul(values.len())
                .filter(|&n| n <= MAX_PATTERN_FILES)
                .ok_or_else(too_many)?;
            segments.push(Segment::Block(values));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Values of each block, in order of appearance.
    pub fn blocks(&self) -> impl Iterator<Item = &[String]> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Block(values) => Some(values.as_slice()),
            Segment::Literal(_) => None,
        })
    }

    /// Number of names the pattern expands to, at most [`MAX_PATTERN_FILES`].
    pub fn len(&self) -> usize {
        self.blocks().map(<[String]>::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand into file names; the last block varies fastest.
    pub fn files(&self) -> Vec<String> {
        let mut names = vec![String::new()];
        for segment in &self.segments {
            names = match segment {
                Segment::Literal(text) => names.into_iter().map(|n| n + text).collect(),
                Segment::Block(values) => names
                    .iter()
                    .flat_map(|n| values.iter().map(move |v| format!("{}{}", n, v)))
                    .collect(),
            };
        }
        names
    }

    /// Whether `name` is one of the names the pattern expands to.
    pub fn matches(&self, name: &str) -> bool {
        matches_from(&self.segments, name)
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for FilePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn matches_from(segments: &[Segment], name: &str) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return name.is_empty();
    };
    match first {
        Segment::Literal(text) => name
            .strip_prefix(text.as_str())
            .is_some_and(|tail| matches_from(rest, tail)),
        Segment::Block(values) => values.iter().any(|v| {
            name.strip_prefix(v.as_str())
                .is_some_and(|tail| matches_from(rest, tail))
        }),
    }
}

fn parse_block(block: &str) -> Result<Vec<String>, PatternError> {
    if block.contains(',') {
        let items: Vec<String> = block.split(',').map(|s| s.trim().to_string()).collect();
        if items.iter().any(String::is_empty) {
            return Err(PatternError::BadRange {
                block: block.to_string(),
            });
        }
        return Ok(items);
    }

    let Some((start, end)) = block.split_once('-') else {
        return Ok(vec![block.trim().to_string()]);
    };
    let bad = || PatternError::BadRange {
        block: block.to_string(),
    };

    let (end, step) = match end.split_once(':') {
        Some((end, step)) => (end, step.trim().parse::<u64>().map_err(|_| bad())?),
        None => (end, 1),
    };
    if step == 0 {
        return Err(PatternError::ZeroStep {
            block: block.to_string(),
        });
    }

    let start = start.trim();
    let first: u64 = start.parse().map_err(|_| bad())?;
    let last: u64 = end.trim().parse().map_err(|_| bad())?;
    if first > last {
        return Err(bad());
    }
    if (last - first) / step >= MAX_PATTERN_FILES as u64 {
        return Err(PatternError::TooManyFiles {
            pattern: format!("<{}>", block),
            limit: MAX_PATTERN_FILES,
        });
    }

    let width = if start.len() > 1 && start.starts_with('0') {
        start.len()
    } else {
        0
    };
    Ok((first..=last)
        .step_by(step as usize)
        .map(|v| format!("{:0width$}", v, width = width))
        .collect())
}

// ============================================================================
// Pattern inference
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Digits(String),
}

fn tokenize(name: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    for c in name.chars() {
        let digit = c.is_ascii_digit();
        match tokens.last_mut() {
            Some(Token::Digits(run)) if digit => run.push(c),
            Some(Token::Text(run)) if !digit => run.push(c),
            _ if digit => tokens.push(Token::Digits(c.to_string())),
            _ => tokens.push(Token::Text(c.to_string())),
        }
    }
    tokens
}

fn same_skeleton(a: &[Token], b: &[Token]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Token::Text(x), Token::Text(y)) => x == y,
            (Token::Digits(_), Token::Digits(_)) => true,
            _ => false,
        })
}

/// Infer a pattern for `name` from the other files in its folder.
///
/// Siblings with the same text around their digit runs belong to the same
/// series. Each digit run that differs across the series becomes a block:
/// an evenly spaced run of numbers becomes a range, anything else a list.
/// Returns `name` unchanged when no sibling belongs to its series.
pub fn find_pattern<S: AsRef<str>>(name: &str, siblings: &[S]) -> String {
    let tokens = tokenize(name);
    let series: Vec<Vec<Token>> = siblings
        .iter()
        .map(|s| tokenize(s.as_ref()))
        .filter(|t| same_skeleton(&tokens, t))
        .collect();

    let mut pattern = String::new();
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Text(text) => pattern.push_str(text),
            Token::Digits(digits) => {
                let mut values: Vec<&str> = series
                    .iter()
                    .filter_map(|t| match &t[i] {
                        Token::Digits(d) => Some(d.as_str()),
                        Token::Text(_) => None,
                    })
                    .collect();
                values.push(digits);
                pattern.push_str(&block_for(digits, values));
            }
        }
    }
    log::debug!("Inferred pattern '{}' for '{}'", pattern, name);
    pattern
}

fn block_for(own: &str, mut values: Vec<&str>) -> String {
    values.sort_unstable();
    values.dedup();
    if values.len() < 2 {
        return own.to_string();
    }

    let parsed: Option<Vec<u64>> = values.iter().map(|v| v.parse().ok()).collect();
    let Some(mut numbers) = parsed else {
        return format!("<{}>", values.join(","));
    };
    numbers.sort_unstable();
    numbers.dedup();
    if numbers.len() != values.len() {
        // same number written with different padding
        return format!("<{}>", values.join(","));
    }

    let step = numbers[1] - numbers[0];
    let even = numbers.windows(2).all(|w| w[1] - w[0] == step);
    let fixed_width = values.iter().all(|v| v.len() == own.len());
    let width = if fixed_width { own.len() } else { 0 };
    let pad = |n: u64| format!("{:0width$}", n, width = width);

    if !even {
        let list: Vec<String> = numbers.iter().map(|&n| pad(n)).collect();
        return format!("<{}>", list.join(","));
    }

    let first = numbers[0];
    let last = numbers[numbers.len() - 1];
    if step == 1 {
        format!("<{}-{}>", pad(first), pad(last))
    } else {
        format!("<{}-{}:{}>", pad(first), pad(last), step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_expansion() {
        let p = FilePattern::new("img<1-3>.tif").unwrap();
        assert_eq!(p.files(), vec!["img1.tif", "img2.tif", "img3.tif"]);
        assert_eq!(p.len(), 3);
        assert_eq!(p.to_string(), "img<1-3>.tif");
    }

    #[test]
    fn test_padding_and_step() {
        let p = FilePattern::new("t<08-12:2>").unwrap();
        assert_eq!(p.files(), vec!["t08", "t10", "t12"]);
    }

    #[test]
    fn test_last_block_varies_fastest() {
        let p = FilePattern::new("<a,b>_<1-2>.png").unwrap();
        assert_eq!(p.files(), vec!["a_1.png", "a_2.png", "b_1.png", "b_2.png"]);
        assert_eq!(p.blocks().count(), 2);
    }

    #[test]
    fn test_plain_name_is_its_own_pattern() {
        let p = FilePattern::new("single.png").unwrap();
        assert_eq!(p.files(), vec!["single.png"]);
        assert!(p.matches("single.png"));
    }

    #[test]
    fn test_matches() {
        let p = FilePattern::new("z<01-10>_<red,green>.tif").unwrap();
        assert!(p.matches("z07_green.tif"));
        assert!(!p.matches("z7_green.tif"));
        assert!(!p.matches("z11_red.tif"));
        assert!(!p.matches("z01_red.tiff"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            FilePattern::new("a<1-3"),
            Err(PatternError::Unterminated { .. })
        ));
        assert!(matches!(
            FilePattern::new("a<>b"),
            Err(PatternError::EmptyBlock { .. })
        ));
        assert!(matches!(
            FilePattern::new("a<5-1>"),
            Err(PatternError::BadRange { .. })
        ));
        assert!(matches!(
            FilePattern::new("a<1-x>"),
            Err(PatternError::BadRange { .. })
        ));
        assert!(matches!(
            FilePattern::new("a<1-9:0>"),
            Err(PatternError::ZeroStep { .. })
        ));
        assert!(matches!(
            FilePattern::new("a<x,,y>"),
            Err(PatternError::BadRange { .. })
        ));
    }

    #[test]
    fn test_expansion_is_capped() {
        // each block is small, their product is not
        let wide = "p<0-99999>_<0-99999>_<0-99999>_<0-99999>.tif";
        assert_eq!(
            FilePattern::new(wide),
            Err(PatternError::TooManyFiles {
                pattern: wide.to_string(),
                limit: MAX_PATTERN_FILES,
            })
        );

        let huge = "p<0-18446744073709551615>.tif";
        assert!(matches!(
            FilePattern::new(huge),
            Err(PatternError::TooManyFiles { ref pattern, .. }) if pattern == huge
        ));

        assert!(FilePattern::new("p<1-1000>_<1-1001>").is_err());
        assert_eq!(FilePattern::new("p<1-1000>_<1-10>").unwrap().len(), 10_000);
    }

    #[test]
    fn test_find_range() {
        let siblings = ["cell1.tif", "cell2.tif", "cell3.tif", "notes.txt"];
        assert_eq!(find_pattern("cell2.tif", &siblings), "cell<1-3>.tif");
    }

    #[test]
    fn test_find_padded_range_with_step() {
        let siblings = ["s000.png", "s005.png", "s010.png"];
        assert_eq!(find_pattern("s000.png", &siblings), "s<000-010:5>.png");
    }

    #[test]
    fn test_find_keeps_constant_runs() {
        let siblings = ["exp2_t1.tif", "exp2_t2.tif", "exp3_t1.tif"];
        // the experiment number varies too, so both runs become blocks
        assert_eq!(find_pattern("exp2_t1.tif", &siblings), "exp<2-3>_t<1-2>.tif");

        let siblings = ["exp2_t1.tif", "exp2_t2.tif"];
        assert_eq!(find_pattern("exp2_t1.tif", &siblings), "exp2_t<1-2>.tif");
    }

    #[test]
    fn test_find_uneven_becomes_list() {
        let siblings = ["f1.png", "f2.png", "f7.png"];
        let pattern = find_pattern("f1.png", &siblings);
        assert_eq!(pattern, "f<1,2,7>.png");
        let expanded = FilePattern::new(&pattern).unwrap().files();
        assert_eq!(expanded, vec!["f1.png", "f2.png", "f7.png"]);
    }

    #[test]
    fn test_find_without_series() {
        let siblings: [&str; 1] = ["other.png"];
        assert_eq!(find_pattern("lonely.png", &siblings), "lonely.png");
    }

    #[test]
    fn test_inferred_pattern_matches_siblings() {
        let siblings = ["a09.tif", "a10.tif", "a11.tif"];
        let pattern = FilePattern::new(&find_pattern("a10.tif", &siblings)).unwrap();
        for name in siblings {
            assert!(pattern.matches(name), "{} not matched", name);
        }
    }
}
