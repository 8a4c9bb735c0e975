//! GGA fragment extraction and coordinate decoding.
//!
//! The receiver streams a `$GNGGA` sentence followed by a `$GNGSA` sentence
//! on every fix. We only care about what lies in between: the GGA fields.
use itertools::Itertools;
use thiserror::Error;

/// Marks the beginning of the fix sentence
pub const GNGGA_MARK: &str = "$GNGGA";

/// Marks the sentence following the fix sentence
pub const GNGSA_MARK: &str = "$GNGSA";

/// Out-of-band value reported when a coordinate could not be determined.
/// Never a valid latitude or longitude.
pub const NO_FIX: f64 = 9999.0;

/// Coordinate axis
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latitude => write!(f, "latitude"),
            Self::Longitude => write!(f, "longitude"),
        }
    }
}

impl Axis {
    /// Hemisphere indicators, in search order: positive one first.
    fn hemispheres(&self) -> [&'static str; 2] {
        match self {
            Self::Latitude => ["N", "S"],
            Self::Longitude => ["E", "W"],
        }
    }

    /// Number of leading degree digits in the coordinate field
    fn degree_digits(&self) -> usize {
        match self {
            Self::Latitude => 2,
            Self::Longitude => 3,
        }
    }

    fn max_degrees(&self) -> f64 {
        match self {
            Self::Latitude => 90.0,
            Self::Longitude => 180.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    #[error("no {0} field ahead of hemisphere indicator")]
    MissingField(Axis),
    #[error("malformed {0} field \"{1}\"")]
    MalformedField(Axis, String),
    #[error("{0} out of range: {1}")]
    OutOfRange(Axis, f64),
}

/// Decoded coordinate, in signed decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Coordinate {
    /// Negative South of the Equator, or West of Greenwich
    Decoded(f64),
    /// Receiver did not report this axis
    Unavailable,
}

impl Coordinate {
    /// Returns value in decimal degrees, [NO_FIX] when [Coordinate::Unavailable].
    pub fn degrees(&self) -> f64 {
        match self {
            Self::Decoded(deg) => *deg,
            Self::Unavailable => NO_FIX,
        }
    }
}

/// Latitude and longitude, always obtained as a pair.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Pairs both axes. Returns None when either is [Coordinate::Unavailable].
    pub fn from_coordinates(latitude: Coordinate, longitude: Coordinate) -> Option<Self> {
        match (latitude, longitude) {
            (Coordinate::Decoded(latitude), Coordinate::Decoded(longitude)) => Some(Self {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lat={:.6} lon={:.6}", self.latitude, self.longitude)
    }
}

/// Returns the text located between the first `$GNGGA` mark
/// and the next `$GNGSA` mark, both excluded.
/// Returns an empty string if either mark is missing,
/// or when no `$GNGSA` mark follows the `$GNGGA` mark (truncated sentence).
pub fn extract_fragment(blob: &str) -> &str {
    blob.split_once(GNGGA_MARK)
        .and_then(|(_, after_gngga)| after_gngga.split_once(GNGSA_MARK))
        .map(|(reading, _)| reading)
        .unwrap_or_default()
}

/// Decodes the latitude from a GGA fragment.
/// Negative South of the Equator.
pub fn decode_latitude(fragment: &str) -> Result<Coordinate, ParsingError> {
    decode(fragment, Axis::Latitude)
}

/// Decodes the longitude from a GGA fragment.
/// Negative West of Greenwich.
pub fn decode_longitude(fragment: &str) -> Result<Coordinate, ParsingError> {
    decode(fragment, Axis::Longitude)
}

fn decode(fragment: &str, axis: Axis) -> Result<Coordinate, ParsingError> {
    let [positive, negative] = axis.hemispheres();

    let fields = fragment.split(',').collect::<Vec<_>>();

    let hemisphere = if fields.contains(&positive) {
        positive
    } else if fields.contains(&negative) {
        negative
    } else {
        return Ok(Coordinate::Unavailable);
    };

    // coordinate field always precedes its hemisphere indicator
    let value = fields
        .iter()
        .tuple_windows()
        .find_map(|(value, indicator)| (*indicator == hemisphere).then_some(*value))
        .ok_or(ParsingError::MissingField(axis))?;

    let degrees = parse_field(value, axis)?;

    if hemisphere == negative {
        Ok(Coordinate::Decoded(-degrees))
    } else {
        Ok(Coordinate::Decoded(degrees))
    }
}

/// Parses a `(d)ddmm.mmmm` field into decimal degrees.
fn parse_field(value: &str, axis: Axis) -> Result<f64, ParsingError> {
    let malformed = || ParsingError::MalformedField(axis, value.to_string());

    let digits = axis.degree_digits();

    if value.len() <= digits || !value.is_char_boundary(digits) {
        return Err(malformed());
    }

    let (deg, minutes) = value.split_at(digits);

    if !deg.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let deg = deg.parse::<f64>().map_err(|_| malformed())?;
    let minutes = minutes.parse::<f64>().map_err(|_| malformed())?;

    if !minutes.is_finite() || minutes < 0.0 {
        return Err(ParsingError::OutOfRange(axis, minutes));
    }

    let degrees = deg + minutes / 60.0;

    if degrees > axis.max_degrees() {
        return Err(ParsingError::OutOfRange(axis, degrees));
    }

    Ok(degrees)
}
