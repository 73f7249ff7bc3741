//! Slide direction and pattern code resolution.
//!
//! Binary chart formats store slide shapes as small integer codes where the
//! arc and `V` shapes carry an explicit direction. The notation instead uses
//! `^`, `>` and `<`, whose direction depends on the lanes involved.

use crate::error::{Result, SimaiError};
use crate::note::{LANE_COUNT, Slide, SlidePattern};

/// Lanes on the upper half of the ring (1, 2, 7, 8 in notation).
pub const TOP_LANES: [u8; 4] = [0, 1, 6, 7];

/// Codes that map to exactly one pattern regardless of lanes.
const FIXED_CODES: [(u8, SlidePattern); 9] = [
    (1, SlidePattern::Straight),
    (4, SlidePattern::CurveP),
    (5, SlidePattern::CurveQ),
    (6, SlidePattern::ZigzagS),
    (7, SlidePattern::ZigzagZ),
    (8, SlidePattern::ViaCenter),
    (9, SlidePattern::LoopP),
    (10, SlidePattern::LoopQ),
    (13, SlidePattern::Fan),
];

const ARC_CCW: u8 = 2;
const ARC_CW: u8 = 3;
const REFLECT_CCW: u8 = 11;
const REFLECT_CW: u8 = 12;

fn is_top(lane: u8) -> bool {
    TOP_LANES.contains(&lane)
}

/// Steps from `start` to `end` walking the ring in one direction.
///
/// Equal lanes are a full turn (8 steps).
pub fn angular_distance(start: u8, end: u8, clockwise: bool) -> u8 {
    if clockwise {
        let end = if start >= end { end + LANE_COUNT } else { end };
        end - start
    } else {
        let start = if start <= end { start + LANE_COUNT } else { start };
        start - end
    }
}

/// Pick the direction of the shorter arc from `start` to `end`.
///
/// Returns `true` for clockwise. Lanes exactly opposite each other have no
/// shorter arc and are rejected.
pub fn resolve_direction(start: u8, end: u8) -> Result<bool> {
    let diff = start.abs_diff(end);
    let other_diff = LANE_COUNT.abs_diff(diff);
    if diff == LANE_COUNT / 2 {
        return Err(SimaiError::AmbiguousDirection { start, end });
    }

    let counter_clockwise =
        (end > start && diff > other_diff) || (end < start && diff < other_diff);
    Ok(!counter_clockwise)
}

/// Map a binary slide code onto a notation pattern, plus the reflect lane for `V`.
pub fn decode_pattern_code(code: u8, start: u8, end: u8) -> Result<(SlidePattern, Option<u8>)> {
    if let Some((_, pattern)) = FIXED_CODES.iter().find(|(c, _)| *c == code) {
        return Ok((*pattern, None));
    }

    match code {
        ARC_CCW | ARC_CW => {
            let clockwise = code == ARC_CW;
            let pattern = if angular_distance(start, end, clockwise) <= 3 {
                SlidePattern::ShortArc
            } else if is_top(start) == clockwise {
                SlidePattern::ArcRight
            } else {
                SlidePattern::ArcLeft
            };
            Ok((pattern, None))
        }
        REFLECT_CCW => Ok((
            SlidePattern::Reflect,
            Some((start + LANE_COUNT - 2) % LANE_COUNT),
        )),
        REFLECT_CW => Ok((SlidePattern::Reflect, Some((start + 2) % LANE_COUNT))),
        other => Err(SimaiError::UnknownPatternCode(other)),
    }
}

/// Inverse of [`decode_pattern_code`], using the slide's own lanes to pick a direction.
pub fn encode_pattern(slide: &Slide) -> Result<u8> {
    let top = is_top(slide.position);
    let code = match slide.pattern {
        SlidePattern::ShortArc => {
            if resolve_direction(slide.position, slide.end_position)? {
                ARC_CW
            } else {
                ARC_CCW
            }
        }
        SlidePattern::ArcRight => {
            if top {
                ARC_CW
            } else {
                ARC_CCW
            }
        }
        SlidePattern::ArcLeft => {
            if top {
                ARC_CCW
            } else {
                ARC_CW
            }
        }
        SlidePattern::Reflect => {
            let reflect = slide
                .reflect_position
                .ok_or(SimaiError::MissingReflectPosition)?;
            if resolve_direction(slide.position, reflect)? {
                REFLECT_CW
            } else {
                REFLECT_CCW
            }
        }
        fixed => FIXED_CODES
            .iter()
            .find(|(_, pattern)| *pattern == fixed)
            .map(|(code, _)| *code)
            .ok_or_else(|| SimaiError::UnknownPattern(fixed.symbol().to_string()))?,
    };
    Ok(code)
}
