use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimaiError};

/// Number of buttons on the outer ring.
pub const LANE_COUNT: u8 = 8;

/// Time in measures between a slide appearing and it starting to move.
pub const DEFAULT_SLIDE_DELAY: f64 = 0.25;

/// Largest measure position, or note length, a chart may hold.
pub const MAX_MEASURE: f64 = 10_000.0;

/// Round a measure or duration to 1e-4, half to even.
///
/// Every constructor and mutation goes through this so that equal positions
/// compare equal when events are grouped by measure.
pub fn round_measure(value: f64) -> f64 {
    (value * 10000.0).round_ties_even() / 10000.0
}

fn check_lane(what: &'static str, value: u8) -> Result<u8> {
    if value < LANE_COUNT {
        Ok(value)
    } else {
        Err(SimaiError::InvalidLane { what, value })
    }
}

/// Measures are rounded here; NaN and infinities are out of range.
pub(crate) fn check_measure(what: &'static str, value: f64) -> Result<f64> {
    if value.abs() <= MAX_MEASURE {
        Ok(round_measure(value))
    } else {
        Err(SimaiError::OutOfRange { what, value })
    }
}

fn check_positive(what: &'static str, value: f64) -> Result<f64> {
    if value.is_nan() || value <= 0.0 {
        Err(SimaiError::NotPositive { what, value })
    } else if value.is_finite() {
        Ok(value)
    } else {
        Err(SimaiError::OutOfRange { what, value })
    }
}

fn check_length(what: &'static str, value: f64) -> Result<f64> {
    let value = check_positive(what, round_measure(value))?;
    if value <= MAX_MEASURE {
        Ok(value)
    } else {
        Err(SimaiError::OutOfRange { what, value })
    }
}

/// The kind of a tap note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TapKind {
    Normal,
    Break,
    Ex,
    Star,
    BreakStar,
    ExStar,
}

impl TapKind {
    /// Combine notation flags; ex wins over break.
    pub fn from_flags(is_break: bool, is_star: bool, is_ex: bool) -> Self {
        match (is_ex, is_star, is_break) {
            (true, true, _) => Self::ExStar,
            (true, false, _) => Self::Ex,
            (false, true, true) => Self::BreakStar,
            (false, true, false) => Self::Star,
            (false, false, true) => Self::Break,
            (false, false, false) => Self::Normal,
        }
    }

    pub fn is_star(self) -> bool {
        matches!(self, Self::Star | Self::BreakStar | Self::ExStar)
    }

    pub fn is_break(self) -> bool {
        matches!(self, Self::Break | Self::BreakStar)
    }

    pub fn is_ex(self) -> bool {
        matches!(self, Self::Ex | Self::ExStar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HoldKind {
    #[default]
    Normal,
    Ex,
}

/// Slide path shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlidePattern {
    /// `-`
    Straight,
    /// `^`: the shorter way around the ring
    ShortArc,
    /// `>`: clockwise when starting from the top half, counter-clockwise otherwise
    ArcRight,
    /// `<`: mirror of `>`
    ArcLeft,
    /// `p`
    CurveP,
    /// `q`
    CurveQ,
    /// `s`
    ZigzagS,
    /// `z`
    ZigzagZ,
    /// `v`: through the center
    ViaCenter,
    /// `pp`
    LoopP,
    /// `qq`
    LoopQ,
    /// `V`: bounces off `reflect_position`
    Reflect,
    /// `w`
    Fan,
}

impl SlidePattern {
    pub const ALL: [SlidePattern; 13] = [
        Self::Straight,
        Self::ShortArc,
        Self::ArcRight,
        Self::ArcLeft,
        Self::CurveP,
        Self::CurveQ,
        Self::ZigzagS,
        Self::ZigzagZ,
        Self::ViaCenter,
        Self::LoopP,
        Self::LoopQ,
        Self::Reflect,
        Self::Fan,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Straight => "-",
            Self::ShortArc => "^",
            Self::ArcRight => ">",
            Self::ArcLeft => "<",
            Self::CurveP => "p",
            Self::CurveQ => "q",
            Self::ZigzagS => "s",
            Self::ZigzagZ => "z",
            Self::ViaCenter => "v",
            Self::LoopP => "pp",
            Self::LoopQ => "qq",
            Self::Reflect => "V",
            Self::Fan => "w",
        }
    }

    pub fn from_symbol(symbol: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.symbol() == symbol)
            .ok_or_else(|| SimaiError::UnknownPattern(symbol.to_string()))
    }

    /// Pattern as written in a slide token. `V` carries its reflect lane.
    pub fn notation(self, reflect_position: Option<u8>) -> Result<String> {
        match (self, reflect_position) {
            (Self::Reflect, Some(reflect)) => Ok(format!("V{}", reflect + 1)),
            (Self::Reflect, None) => Err(SimaiError::MissingReflectPosition),
            (other, _) => Ok(other.symbol().to_string()),
        }
    }
}

impl fmt::Display for SlidePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Touch sensor regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TouchZone {
    A,
    B,
    C,
    D,
    E,
}

impl TouchZone {
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            'A' => Ok(Self::A),
            'B' => Ok(Self::B),
            'C' => Ok(Self::C),
            'D' => Ok(Self::D),
            'E' => Ok(Self::E),
            other => Err(SimaiError::UnknownZone(other)),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    pub measure: f64,
    pub position: u8,
    pub kind: TapKind,
}

impl Tap {
    pub fn new(measure: f64, position: u8, kind: TapKind) -> Result<Self> {
        Ok(Self {
            measure: check_measure("tap measure", measure)?,
            position: check_lane("tap position", position)?,
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hold {
    pub measure: f64,
    pub position: u8,
    /// Length in measures
    pub duration: f64,
    pub kind: HoldKind,
}

impl Hold {
    pub fn new(measure: f64, position: u8, duration: f64, kind: HoldKind) -> Result<Self> {
        Ok(Self {
            measure: check_measure("hold measure", measure)?,
            position: check_lane("hold position", position)?,
            duration: check_length("hold duration", duration)?,
            kind,
        })
    }
}

/// A slide note. `duration` excludes `delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub measure: f64,
    pub position: u8,
    pub end_position: u8,
    pub pattern: SlidePattern,
    /// Only set for [`SlidePattern::Reflect`]
    pub reflect_position: Option<u8>,
    pub duration: f64,
    pub delay: f64,
}

impl Slide {
    pub fn new(
        measure: f64,
        position: u8,
        end_position: u8,
        pattern: SlidePattern,
        reflect_position: Option<u8>,
        duration: f64,
        delay: f64,
    ) -> Result<Self> {
        let duration = check_length("slide duration", duration)?;
        let delay = round_measure(delay);
        if delay < 0.0 || delay.is_nan() {
            return Err(SimaiError::Negative {
                what: "slide delay",
                value: delay,
            });
        }
        if delay > MAX_MEASURE {
            return Err(SimaiError::OutOfRange {
                what: "slide delay",
                value: delay,
            });
        }
        let reflect_position = match (pattern, reflect_position) {
            (SlidePattern::Reflect, Some(reflect)) => {
                Some(check_lane("slide reflect position", reflect)?)
            }
            (SlidePattern::Reflect, None) => return Err(SimaiError::MissingReflectPosition),
            (_, None) => None,
            (other, Some(_)) => return Err(SimaiError::UnexpectedReflectPosition(other)),
        };

        Ok(Self {
            measure: check_measure("slide measure", measure)?,
            position: check_lane("slide start position", position)?,
            end_position: check_lane("slide end position", end_position)?,
            pattern,
            reflect_position,
            duration,
            delay,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchTap {
    pub measure: f64,
    /// Index within the zone (0-based)
    pub position: u8,
    pub zone: TouchZone,
    pub is_firework: bool,
}

impl TouchTap {
    pub fn new(measure: f64, position: u8, zone: TouchZone, is_firework: bool) -> Result<Self> {
        Ok(Self {
            measure: check_measure("touch measure", measure)?,
            position: check_lane("touch position", position)?,
            zone,
            is_firework,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchHold {
    pub measure: f64,
    pub position: u8,
    pub zone: TouchZone,
    pub duration: f64,
    pub is_firework: bool,
}

impl TouchHold {
    pub fn new(
        measure: f64,
        position: u8,
        zone: TouchZone,
        duration: f64,
        is_firework: bool,
    ) -> Result<Self> {
        Ok(Self {
            measure: check_measure("touch hold measure", measure)?,
            position: check_lane("touch position", position)?,
            zone,
            duration: check_length("touch hold duration", duration)?,
            is_firework,
        })
    }
}

/// A single note in the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Note {
    Tap(Tap),
    Hold(Hold),
    Slide(Slide),
    TouchTap(TouchTap),
    TouchHold(TouchHold),
}

impl Note {
    pub fn measure(&self) -> f64 {
        match self {
            Self::Tap(n) => n.measure,
            Self::Hold(n) => n.measure,
            Self::Slide(n) => n.measure,
            Self::TouchTap(n) => n.measure,
            Self::TouchHold(n) => n.measure,
        }
    }

    pub fn position(&self) -> u8 {
        match self {
            Self::Tap(n) => n.position,
            Self::Hold(n) => n.position,
            Self::Slide(n) => n.position,
            Self::TouchTap(n) => n.position,
            Self::TouchHold(n) => n.position,
        }
    }

    pub(crate) fn set_measure(&mut self, measure: f64) {
        let measure = round_measure(measure);
        match self {
            Self::Tap(n) => n.measure = measure,
            Self::Hold(n) => n.measure = measure,
            Self::Slide(n) => n.measure = measure,
            Self::TouchTap(n) => n.measure = measure,
            Self::TouchHold(n) => n.measure = measure,
        }
    }

    /// Measure where a hold or slide finishes (slides include their delay).
    pub fn end_measure(&self) -> Option<f64> {
        match self {
            Self::Hold(n) => Some(n.measure + n.duration),
            Self::TouchHold(n) => Some(n.measure + n.duration),
            Self::Slide(n) => Some(n.measure + n.delay + n.duration),
            Self::Tap(_) | Self::TouchTap(_) => None,
        }
    }
}

/// BPM change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoMarker {
    pub measure: f64,
    pub bpm: f64,
}

impl TempoMarker {
    pub fn new(measure: f64, bpm: f64) -> Result<Self> {
        Ok(Self {
            measure: check_measure("tempo measure", measure)?,
            bpm: check_positive("BPM", bpm)?,
        })
    }
}
