//! Two-line element set codec
//!
//! A TLE is a 24-character name line plus two fixed-width 69-character
//! data lines; every field lives at a documented byte position and the
//! last byte of each data line is a mod-10 checksum (digits count their
//! value, minus signs count one). The codec keeps the raw lines, so
//! printing after parsing is byte-identical; the views decode the
//! spacecraft bookkeeping block and the Keplerian element set on demand.
//!
//! ```
//! use astrokit::tle::Tle;
//!
//! let text = "ISS (ZARYA)\n\
//!     1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927\n\
//!     2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
//! let tle = Tle::from_string(text, '\n').unwrap();
//! assert_eq!(tle.basic_data().unwrap().catalog_number, 25544);
//! ```

use crate::angle::Angle;
use crate::constants::{DAY_S, GM_EARTH, TAU};
use crate::orbit::KeplerianOrbitElems;
use crate::{AstrokitError, Result};

/// Maximum satellite name length (NORAD SATCAT width)
pub const TITLE_LENGTH: usize = 24;
/// Length of each data line
pub const DATA_LENGTH: usize = 69;
/// Byte position of the checksum in each data line
pub const CHECKSUM_POS: usize = 68;

/// Satellite classification letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Unclassified,
    Classified,
    Secret,
}

impl Classification {
    fn from_char(c: char) -> Self {
        match c {
            'C' => Classification::Classified,
            'S' => Classification::Secret,
            _ => Classification::Unclassified,
        }
    }
}

/// International (COSPAR) designator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosparId {
    /// Last two digits of the launch year
    pub launch_year: u32,
    /// Launch number of that year
    pub launch_number: u32,
    /// Piece of the launch (up to three letters)
    pub launch_piece: String,
}

/// Bookkeeping block of line 1 plus the revolution counter of line 2
#[derive(Debug, Clone)]
pub struct SpacecraftBasicData {
    pub catalog_number: u32,
    pub classification: Classification,
    pub intl_designator: CosparId,
    /// First derivative of mean motion (rev/day²)
    pub d1_mean_motion: f64,
    /// Second derivative of mean motion (rev/day³)
    pub d2_mean_motion: f64,
    /// B* drag term (1/Earth radii)
    pub bstar: f64,
    pub ephemeris_type: u32,
    pub element_set: u32,
    pub revolution_number: u32,
}

/// One two-line element set, stored as its raw lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tle {
    title: String,
    line1: String,
    line2: String,
}

/// Mod-10 checksum over bytes 0..=67: digits at face value, minus signs
/// count one, everything else zero.
pub fn checksum(line: &str) -> u32 {
    line.chars()
        .take(CHECKSUM_POS)
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

/// Verify the length, line-number tag and checksum of one data line.
pub fn verify_line(line: &str, expected_number: char, line_index: usize) -> Result<()> {
    if line.len() != DATA_LENGTH {
        return Err(AstrokitError::Format {
            line: line_index,
            message: format!("expected {DATA_LENGTH} bytes, got {}", line.len()),
        });
    }
    if line.chars().next() != Some(expected_number) {
        return Err(AstrokitError::Format {
            line: line_index,
            message: format!("line must start with '{expected_number}'"),
        });
    }
    let stated = line
        .chars()
        .nth(CHECKSUM_POS)
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| AstrokitError::Format {
            line: line_index,
            message: "checksum byte is not a digit".into(),
        })?;
    let computed = checksum(line);
    if stated != computed {
        return Err(AstrokitError::Format {
            line: line_index,
            message: format!("checksum mismatch: stated {stated}, computed {computed}"),
        });
    }
    Ok(())
}

/// Field slice by 0-indexed byte range, trimmed
fn field(line: &str, start: usize, end: usize) -> &str {
    line[start..end].trim()
}

fn parse_u32(line: &str, start: usize, end: usize, line_index: usize) -> Result<u32> {
    let s = field(line, start, end);
    if s.is_empty() {
        return Ok(0);
    }
    s.parse().map_err(|_| AstrokitError::Format {
        line: line_index,
        message: format!("invalid integer field at bytes {}..{}: {s:?}", start + 1, end),
    })
}

fn parse_f64(line: &str, start: usize, end: usize, line_index: usize) -> Result<f64> {
    let s = field(line, start, end);
    s.parse().map_err(|_| AstrokitError::Format {
        line: line_index,
        message: format!("invalid numeric field at bytes {}..{}: {s:?}", start + 1, end),
    })
}

/// Decimal-exponent field like `-11606-4`, meaning −0.11606 × 10⁻⁴.
fn parse_decimal_exponent(raw: &str, line_index: usize) -> Result<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(0.0);
    }
    let bad = || AstrokitError::Format {
        line: line_index,
        message: format!("invalid decimal-exponent field: {raw:?}"),
    };
    // split off the exponent: the sign (or last digit boundary) after the
    // mantissa
    let exp_pos = s
        .char_indices()
        .collect::<Vec<_>>()
        .into_iter()
        .skip(1)
        .rev()
        .find(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i);
    let (mantissa_str, exponent) = match exp_pos {
        Some(i) => {
            let exp: i32 = s[i..].parse().map_err(|_| bad())?;
            (&s[..i], exp)
        }
        None => (s, 0),
    };
    let (sign, digits) = match mantissa_str.chars().next() {
        Some('-') => (-1.0, &mantissa_str[1..]),
        Some('+') => (1.0, &mantissa_str[1..]),
        _ => (1.0, mantissa_str),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let mantissa: f64 = digits.parse::<u64>().map_err(|_| bad())? as f64
        / 10f64.powi(digits.len() as i32);
    Ok(sign * mantissa * 10f64.powi(exponent))
}

/// Julian date of a Gregorian calendar day (0h UT)
fn julian_date(year: i32, month: u32, day: f64) -> f64 {
    let (y, m) = if month <= 2 {
        (year - 1, month + 12)
    } else {
        (year, month)
    };
    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y as f64 + 4716.0)).floor() + (30.6001 * (m as f64 + 1.0)).floor() + day + b
        - 1524.5
}

impl Tle {
    /// Build from a name and two verified data lines.
    pub fn new(title: &str, line1: &str, line2: &str) -> Result<Self> {
        let line1 = line1.trim_end_matches(['\r', '\n']).to_string();
        let line2 = line2.trim_end_matches(['\r', '\n']).to_string();
        verify_line(&line1, '1', 1)?;
        verify_line(&line2, '2', 2)?;
        let cat1 = field(&line1, 2, 7);
        let cat2 = field(&line2, 2, 7);
        if cat1 != cat2 {
            return Err(AstrokitError::Format {
                line: 2,
                message: format!("catalog number mismatch between lines: {cat1} vs {cat2}"),
            });
        }
        let mut title = title.trim().to_string();
        title.truncate(TITLE_LENGTH);
        Ok(Tle {
            title,
            line1,
            line2,
        })
    }

    /// Parse a 2- or 3-line element set from text.
    pub fn from_string(data: &str, delim: char) -> Result<Self> {
        let lines: Vec<&str> = data
            .split(delim)
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .collect();
        match lines.len() {
            2 => Tle::new("", lines[0], lines[1]),
            3 => Tle::new(lines[0], lines[1], lines[2]),
            n => Err(AstrokitError::Format {
                line: n,
                message: format!("expected 2 or 3 lines, got {n}"),
            }),
        }
    }

    /// Print the element set; a 3-line form when a name is present.
    pub fn to_string_with(&self, delim: char) -> String {
        if self.title.is_empty() {
            format!("{}{}{}", self.line1, delim, self.line2)
        } else {
            format!("{}{}{}{}{}", self.title, delim, self.line1, delim, self.line2)
        }
    }

    /// Both checksums and line tags are intact.
    pub fn is_valid(&self) -> bool {
        verify_line(&self.line1, '1', 1).is_ok() && verify_line(&self.line2, '2', 2).is_ok()
    }

    pub fn satellite_name(&self) -> &str {
        &self.title
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// Decode the spacecraft bookkeeping fields.
    pub fn basic_data(&self) -> Result<SpacecraftBasicData> {
        let l1 = &self.line1;
        let l2 = &self.line2;
        Ok(SpacecraftBasicData {
            catalog_number: parse_u32(l1, 2, 7, 1)?,
            classification: Classification::from_char(
                l1.chars().nth(7).unwrap_or('U'),
            ),
            intl_designator: CosparId {
                launch_year: parse_u32(l1, 9, 11, 1)?,
                launch_number: parse_u32(l1, 11, 14, 1)?,
                launch_piece: field(l1, 14, 17).to_string(),
            },
            d1_mean_motion: parse_f64(l1, 33, 43, 1)?,
            d2_mean_motion: parse_decimal_exponent(field(l1, 44, 52), 1)?,
            bstar: parse_decimal_exponent(field(l1, 53, 61), 1)?,
            ephemeris_type: parse_u32(l1, 62, 63, 1)?,
            element_set: parse_u32(l1, 64, 68, 1)?,
            revolution_number: parse_u32(l2, 63, 68, 2)?,
        })
    }

    /// Epoch of the element set as a Julian date (UTC).
    pub fn epoch_jd(&self) -> Result<f64> {
        let year2 = parse_u32(&self.line1, 18, 20, 1)?;
        // TLE convention: 57..99 are 19xx, 00..56 are 20xx
        let year = if year2 >= 57 { 1900 + year2 } else { 2000 + year2 } as i32;
        let day_of_year = parse_f64(&self.line1, 20, 32, 1)?;
        Ok(julian_date(year, 1, 0.0) + day_of_year)
    }

    /// Keplerian element set of the orbit, with the semi-major axis from
    /// Kepler's third law and the geocentric gravitational parameter.
    pub fn orbit_elems(&self) -> Result<KeplerianOrbitElems> {
        let l2 = &self.line2;
        let inclination = parse_f64(l2, 8, 16, 2)?;
        let ascending_node = parse_f64(l2, 17, 25, 2)?;
        // eccentricity field has an implied leading decimal point
        let ecc_digits = field(l2, 26, 33);
        let eccentricity = format!("0.{ecc_digits}")
            .parse::<f64>()
            .map_err(|_| AstrokitError::Format {
                line: 2,
                message: format!("invalid eccentricity field: {ecc_digits:?}"),
            })?;
        let arg_of_pericenter = parse_f64(l2, 34, 42, 2)?;
        let mean_anomaly = parse_f64(l2, 43, 51, 2)?;
        let mean_motion_rev_day = parse_f64(l2, 52, 63, 2)?;
        if mean_motion_rev_day <= 0.0 {
            return Err(AstrokitError::Format {
                line: 2,
                message: format!("mean motion must be positive, got {mean_motion_rev_day}"),
            });
        }

        let n_rad_s = mean_motion_rev_day * TAU / DAY_S;
        let a = (GM_EARTH / (n_rad_s * n_rad_s)).cbrt();

        KeplerianOrbitElems {
            ref_plane: Some("Equator".into()),
            epoch: self.epoch_jd()?,
            grav_param: GM_EARTH,
            pericenter_dist: a * (1.0 - eccentricity),
            period: DAY_S / mean_motion_rev_day,
            eccentricity,
            inclination: Angle::from_degrees(inclination),
            ascending_node: Angle::from_degrees(ascending_node),
            arg_of_pericenter: Angle::from_degrees(arg_of_pericenter),
            mean_anomaly: Angle::from_degrees(mean_anomaly),
        }
        .completed()
    }
}

impl std::fmt::Display for Tle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_with('\n'))
    }
}
