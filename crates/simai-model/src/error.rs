use thiserror::Error;

use crate::note::SlidePattern;

pub type Result<T> = std::result::Result<T, SimaiError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimaiError {
    #[error("{what} must be positive, got {value}")]
    NotPositive { what: &'static str, value: f64 },

    #[error("{what} is out of range, got {value}")]
    OutOfRange { what: &'static str, value: f64 },

    #[error("{what} must not be negative, got {value}")]
    Negative { what: &'static str, value: f64 },

    #[error("{what} {value} is outside 0..=7")]
    InvalidLane { what: &'static str, value: u8 },

    #[error("Unknown slide pattern: {0}")]
    UnknownPattern(String),

    #[error("Unknown slide pattern code: {0}")]
    UnknownPatternCode(u8),

    #[error("Unknown {note} modifier: {modifier}")]
    UnknownModifier {
        note: &'static str,
        modifier: String,
    },

    #[error("Unknown touch zone: {0}")]
    UnknownZone(char),

    #[error("Slide pattern 'V' is given without a reflect position")]
    MissingReflectPosition,

    #[error("Slide pattern '{0}' does not take a reflect position")]
    UnexpectedReflectPosition(SlidePattern),

    #[error("Measure {next} comes before measure {current}")]
    OutOfOrder { current: f64, next: f64 },

    #[error("Multiple BPM defined at measure {0}")]
    DuplicateTempo(f64),

    #[error("No BPMs defined")]
    NoTempo,

    #[error("No starting BPM defined")]
    NoStartingTempo,

    #[error("Can't choose a direction between lanes {start} and {end}: they are 180 degrees apart")]
    AmbiguousDirection { start: u8, end: u8 },

    #[error("Syntax error at byte {offset} of {fragment:?}: {message}")]
    Syntax {
        fragment: String,
        offset: usize,
        message: String,
    },

    #[error("Fragment {index} ({fragment:?}): {source}")]
    Fragment {
        index: usize,
        fragment: String,
        #[source]
        source: Box<SimaiError>,
    },
}

impl SimaiError {
    /// The innermost error, looking through `Fragment` context.
    pub fn root_cause(&self) -> &SimaiError {
        match self {
            Self::Fragment { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
