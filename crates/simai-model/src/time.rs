//! Measure <-> seconds conversion under piecewise-constant tempo.
//!
//! Breakpoints are `(measure, bpm)` pairs; a measure is four beats, so a span
//! of `m` measures at `bpm` lasts `240 * m / bpm` seconds. Time zero is
//! measure 1.0, and the walk starts there with the first breakpoint's tempo.
//!
//! The snap tolerance is compared against measures in one direction and
//! seconds in the other. Above 480 BPM half a millisecond spans more than
//! 0.0005 measures, so [`second_to_measure`] can land up to
//! `SNAP_TOLERANCE * bpm / 240` measures away from the inverse of
//! [`measure_to_second`].

use crate::error::{Result, SimaiError};

/// Queries this close to a breakpoint snap onto it, absorbing the 1e-4
/// rounding applied to stored measures.
const SNAP_TOLERANCE: f64 = 0.0005;

fn span_seconds(measures: f64, bpm: f64) -> f64 {
    240.0 * measures / bpm
}

fn span_measures(seconds: f64, bpm: f64) -> f64 {
    seconds * bpm / 240.0
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= SNAP_TOLERANCE
}

/// Validate and sort by measure (stable, so equal measures keep their order).
fn sorted_breakpoints(breakpoints: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
    if breakpoints.is_empty() {
        return Err(SimaiError::NoTempo);
    }
    if let Some(&(_, bpm)) = breakpoints.iter().find(|(_, bpm)| !(*bpm > 0.0)) {
        return Err(SimaiError::NotPositive { what: "BPM", value: bpm });
    }
    if !breakpoints
        .iter()
        .any(|(measure, _)| (0.0..=1.0).contains(measure))
    {
        return Err(SimaiError::NoStartingTempo);
    }

    let mut sorted = breakpoints.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(sorted)
}

pub fn measure_to_second(measure: f64, breakpoints: &[(f64, f64)]) -> Result<f64> {
    let breakpoints = sorted_breakpoints(breakpoints)?;
    if measure <= 1.0 {
        return Ok(0.0);
    }

    let mut previous_measure = 1.0;
    let mut previous_bpm = breakpoints[0].1;
    let mut previous_time = 0.0;
    for &(current_measure, current_bpm) in &breakpoints {
        let current_time =
            previous_time + span_seconds(current_measure - previous_measure, previous_bpm);
        if is_close(current_measure, measure) {
            return Ok(current_time);
        }
        if current_measure > measure {
            break;
        }
        previous_measure = current_measure;
        previous_bpm = current_bpm;
        previous_time = current_time;
    }

    Ok(previous_time + span_seconds(measure - previous_measure, previous_bpm))
}

pub fn second_to_measure(seconds: f64, breakpoints: &[(f64, f64)]) -> Result<f64> {
    let breakpoints = sorted_breakpoints(breakpoints)?;
    if seconds <= 0.0 {
        return Ok(1.0);
    }

    let mut previous_measure = 1.0;
    let mut previous_bpm = breakpoints[0].1;
    let mut previous_time = 0.0;
    for &(current_measure, current_bpm) in &breakpoints {
        let current_time =
            previous_time + span_seconds(current_measure - previous_measure, previous_bpm);
        if is_close(current_time, seconds) {
            return Ok(current_measure);
        }
        if current_time > seconds {
            break;
        }
        previous_measure = current_measure;
        previous_bpm = current_bpm;
        previous_time = current_time;
    }

    Ok(previous_measure + span_measures(seconds - previous_time, previous_bpm))
}

/// Snap `measure` to the nearest multiple of `1 / grid`.
pub fn quantise(measure: f64, grid: u32) -> Result<f64> {
    if grid == 0 {
        return Err(SimaiError::NotPositive {
            what: "quantisation grid",
            value: 0.0,
        });
    }
    let grid = f64::from(grid);
    Ok((grid * measure).round_ties_even() / grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn constant_tempo() {
        let bpm = [(1.0, 120.0)];
        // one measure at 120 BPM is two seconds
        assert!((measure_to_second(2.0, &bpm).unwrap() - 2.0).abs() < EPSILON);
        assert!((measure_to_second(3.5, &bpm).unwrap() - 5.0).abs() < EPSILON);
        assert!((second_to_measure(5.0, &bpm).unwrap() - 3.5).abs() < EPSILON);
    }

    #[test]
    fn tempo_change() {
        let bpm = [(1.0, 120.0), (2.0, 240.0)];
        assert!((measure_to_second(2.0, &bpm).unwrap() - 2.0).abs() < EPSILON);
        assert!((measure_to_second(3.0, &bpm).unwrap() - 3.0).abs() < EPSILON);
        assert!((second_to_measure(2.5, &bpm).unwrap() - 2.5).abs() < EPSILON);
        assert!((second_to_measure(1.0, &bpm).unwrap() - 1.5).abs() < EPSILON);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let bpm = [(2.0, 240.0), (1.0, 120.0)];
        assert!((measure_to_second(3.0, &bpm).unwrap() - 3.0).abs() < EPSILON);
    }

    #[test]
    fn breakpoint_snapping() {
        let bpm = [(1.0, 120.0), (2.0, 60.0)];
        // 2.0004 snaps onto the breakpoint at 2.0
        assert_eq!(measure_to_second(2.0004, &bpm).unwrap(), 2.0);
        assert_eq!(second_to_measure(2.0003, &bpm).unwrap(), 2.0);
    }

    #[test]
    fn high_tempo_snaps_in_seconds() {
        // a thousandth of a measure at 1000 BPM is 0.24 ms, inside the snap
        let fast = [(1.0, 1000.0)];
        let seconds = measure_to_second(1.001, &fast).unwrap();
        assert!((seconds - 0.00024).abs() < EPSILON);
        assert_eq!(second_to_measure(seconds, &fast).unwrap(), 1.0);

        let slow = [(1.0, 200.0)];
        let seconds = measure_to_second(1.001, &slow).unwrap();
        assert!((second_to_measure(seconds, &slow).unwrap() - 1.001).abs() < EPSILON);
    }

    #[test]
    fn before_start() {
        let bpm = [(1.0, 120.0)];
        assert_eq!(measure_to_second(0.5, &bpm).unwrap(), 0.0);
        assert_eq!(measure_to_second(1.0, &bpm).unwrap(), 0.0);
        assert_eq!(second_to_measure(-3.0, &bpm).unwrap(), 1.0);
    }

    #[test]
    fn invalid_breakpoints() {
        assert_eq!(measure_to_second(2.0, &[]), Err(SimaiError::NoTempo));
        assert_eq!(
            measure_to_second(2.0, &[(1.5, 120.0)]),
            Err(SimaiError::NoStartingTempo)
        );
        assert!(matches!(
            second_to_measure(2.0, &[(1.0, 0.0)]),
            Err(SimaiError::NotPositive { what: "BPM", .. })
        ));
        // validation happens even for positions before the start
        assert_eq!(measure_to_second(0.5, &[]), Err(SimaiError::NoTempo));
    }

    #[test]
    fn quantise_snaps_to_grid() {
        assert_eq!(quantise(1.26, 4).unwrap(), 1.25);
        assert_eq!(quantise(1.3, 8).unwrap(), 1.25);
        assert_eq!(quantise(1.9, 1).unwrap(), 2.0);
        // ties go to the even multiple
        assert_eq!(quantise(1.125, 4).unwrap(), 1.0);
        assert_eq!(quantise(1.375, 4).unwrap(), 1.5);
        assert!(quantise(1.0, 0).is_err());
    }
}
