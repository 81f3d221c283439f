//! Reader for GAD parameter files.
//!
//! A parameter file is plain text with one value per line: ten header
//! values followed by chainage/level pairs. Blank lines are ignored.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Number of positional header lines before the cross-section pairs.
pub const HEADER_LINES: usize = 10;

/// Degrees-to-radians factor used by the drawing routines.
const DEG_TO_RAD: f64 = 0.0174532;

/// A chainage/level pair describing the ground profile at one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionInput {
    pub chainage: f64,
    pub level: f64,
}

/// Parsed contents of a GAD parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeInput {
    /// Scale for plan and elevation.
    pub scale1: f64,
    /// Scale for sections.
    pub scale2: f64,
    /// Skew angle in degrees.
    pub skew: f64,
    pub datum: f64,
    /// Top level on the Y axis.
    pub toprl: f64,
    /// Start chainage of the X axis.
    pub left: f64,
    /// End chainage of the X axis.
    pub right: f64,
    pub xincr: f64,
    pub yincr: f64,
    /// Declared number of chainages.
    pub noch: i64,
    #[serde(default)]
    pub cross_sections: Vec<CrossSectionInput>,
}

/// Constants the drawing routines derive from the header values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingConstants {
    /// Ratio of plan scale to section scale.
    pub sc: f64,
    pub skew_radians: f64,
    pub sin: f64,
    pub cos: f64,
    pub tan: f64,
    pub hhs: f64,
    pub vvs: f64,
}

impl BridgeInput {
    pub fn drawing_constants(&self) -> DrawingConstants {
        let skew_radians = self.skew * DEG_TO_RAD;
        let (sin, cos) = skew_radians.sin_cos();
        DrawingConstants {
            sc: self.scale1 / self.scale2,
            skew_radians,
            sin,
            cos,
            tan: sin / cos,
            hhs: 1000.0,
            vvs: 1000.0,
        }
    }
}

/// Parses raw file text into a [`BridgeInput`].
///
/// A trailing unpaired cross-section line is dropped.
pub fn parse_input(content: &str) -> Result<BridgeInput, ParseError> {
    let lines: Vec<&str> = content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < HEADER_LINES {
        return Err(ParseError::InsufficientData);
    }

    let cross_sections = lines[HEADER_LINES..]
        .chunks_exact(2)
        .map(|pair| {
            Ok(CrossSectionInput {
                chainage: parse_real(pair[0])?,
                level: parse_real(pair[1])?,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(BridgeInput {
        scale1: parse_real(lines[0])?,
        scale2: parse_real(lines[1])?,
        skew: parse_real(lines[2])?,
        datum: parse_real(lines[3])?,
        toprl: parse_real(lines[4])?,
        left: parse_real(lines[5])?,
        right: parse_real(lines[6])?,
        xincr: parse_real(lines[7])?,
        yincr: parse_real(lines[8])?,
        noch: lines[9]
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidNumber)?,
        cross_sections,
    })
}

fn parse_real(s: &str) -> Result<f64, ParseError> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber),
    }
}

/// Checks the value ranges a drawing needs.
///
/// Reports every failing field at once.
pub fn validate_input(input: &BridgeInput) -> Result<(), ParseError> {
    let mut problems = Vec::new();

    for (name, value) in [
        ("scale1", input.scale1),
        ("scale2", input.scale2),
        ("xincr", input.xincr),
        ("yincr", input.yincr),
    ] {
        if value <= 0.0 {
            problems.push(format!("{} must be positive (got {})", name, value));
        }
    }
    if input.noch <= 0 {
        problems.push(format!("noch must be a positive integer (got {})", input.noch));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ParseError::Validation {
            message: problems.join("; "),
        })
    }
}

/// Parses and validates in one step.
pub fn read_bridge_input(content: &str) -> Result<BridgeInput, ParseError> {
    let input = parse_input(content)?;
    validate_input(&input)?;
    Ok(input)
}
