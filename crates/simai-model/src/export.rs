use std::collections::BTreeSet;

use log::debug;

use crate::chart::Chart;
use crate::config::ExportOptions;
use crate::error::{Result, SimaiError};
use crate::note::{
    DEFAULT_SLIDE_DELAY, Hold, HoldKind, Note, Slide, Tap, TapKind, TempoMarker, TouchHold,
    TouchTap, check_measure, round_measure,
};
use crate::rest::{fraction_parts, limit_denominator, rest_with_limit};

/// Simai chart text encoder
#[derive(Debug, Clone, Default)]
pub struct SimaiEncoder {
    options: ExportOptions,
}

/// Everything that starts at one measure
#[derive(Default)]
struct MeasureGroup<'a> {
    notes: Vec<&'a Note>,
    tempos: Vec<&'a TempoMarker>,
}

impl SimaiEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Serialize `chart`, ending with the `E` terminator.
    pub fn encode(&self, chart: &Chart) -> Result<String> {
        if chart.tempo_markers().is_empty() {
            return Err(SimaiError::NoTempo);
        }
        if chart.lookup_tempo(1.0).is_none() {
            return Err(SimaiError::NoStartingTempo);
        }
        // a shift can carry positions past what the rest counts can express
        for note in chart.notes() {
            check_measure("note measure", note.measure())?;
        }
        for marker in chart.tempo_markers() {
            check_measure("tempo measure", marker.measure)?;
        }

        let (measures, groups) = group_by_measure(chart);
        let max_denominator = self.options.max_denominator;

        let mut result = String::new();
        let mut previous_whole = 1.0;
        let mut pending_end = 1.0;
        let mut previous_divisor: Option<u64> = None;
        let mut governing_bpm: Option<f64> = None;

        for (i, (&measure, group)) in measures.iter().zip(&groups).enumerate() {
            // The first marker added at a measure governs it
            if let Some(tempo) = group.tempos.first() {
                governing_bpm = Some(tempo.bpm);
            }
            for end in group.notes.iter().filter_map(|note| note.end_measure()) {
                if end > pending_end {
                    pending_end = end;
                }
            }

            let whole = measure.trunc();
            if whole > previous_whole {
                previous_whole = whole;
                if self.options.measure_line_breaks {
                    result.push('\n');
                }
            }

            // Rest up to the next event, or past the last hold or slide
            let target = match measures.get(i + 1) {
                Some(&next) => Some(next),
                None if pending_end > measure => Some(pending_end),
                None => None,
            };
            let gap = match target {
                Some(next) => rest_with_limit(measure, next, max_denominator)?,
                None => None,
            };

            let mut divisor = match gap {
                Some(rest) if rest.whole > 0 => Some(1),
                Some(rest) => Some(rest.divisor),
                None => previous_divisor,
            };
            let divisor_token = if divisor != previous_divisor {
                divisor
            } else {
                None
            };

            write_fragment(
                &mut result,
                group,
                governing_bpm,
                divisor_token,
                max_denominator,
            )?;

            if let Some(rest) = gap {
                push_commas(&mut result, rest.whole);
                if divisor != Some(rest.divisor) {
                    result.push_str(&format!("{{{}}}", rest.divisor));
                    divisor = Some(rest.divisor);
                }
                push_commas(&mut result, rest.amount);
            }
            previous_divisor = divisor;
        }

        result.push_str(",\nE");
        debug!(
            "Encoded {} notes over {} distinct measures",
            chart.note_count(),
            measures.len()
        );
        Ok(result)
    }
}

fn push_commas(result: &mut String, count: u64) {
    for _ in 0..count {
        result.push(',');
    }
}

/// Distinct sorted measures, each paired with the notes and tempos starting there.
fn group_by_measure(chart: &Chart) -> (Vec<f64>, Vec<MeasureGroup<'_>>) {
    let mut measures: Vec<f64> = chart
        .notes()
        .iter()
        .map(Note::measure)
        .chain(chart.tempo_markers().iter().map(|marker| marker.measure))
        .collect();
    measures.sort_by(f64::total_cmp);
    measures.dedup_by(|a, b| a.total_cmp(b).is_eq());

    let mut groups: Vec<MeasureGroup> = measures.iter().map(|_| MeasureGroup::default()).collect();
    for note in chart.notes() {
        if let Ok(i) = measures.binary_search_by(|m| m.total_cmp(&note.measure())) {
            groups[i].notes.push(note);
        }
    }
    for marker in chart.tempo_markers() {
        if let Ok(i) = measures.binary_search_by(|m| m.total_cmp(&marker.measure)) {
            groups[i].tempos.push(marker);
        }
    }
    (measures, groups)
}

/// `[den:num]` body of a duration, without brackets.
fn duration_ratio(duration: f64, max_denominator: u64) -> String {
    let (numer, denom) = fraction_parts(&limit_denominator(duration, max_denominator));
    format!("{denom}:{numer}")
}

fn separate(body: &mut String) {
    if !body.is_empty() {
        body.push('/');
    }
}

fn write_fragment(
    result: &mut String,
    group: &MeasureGroup<'_>,
    bpm: Option<f64>,
    divisor: Option<u64>,
    max_denominator: u64,
) -> Result<()> {
    match group.tempos.as_slice() {
        [] => {}
        [tempo] => {
            result.push_str(&format!("({})", tempo.bpm));
        }
        [first, ..] => return Err(SimaiError::DuplicateTempo(first.measure)),
    }
    if let Some(divisor) = divisor {
        result.push_str(&format!("{{{divisor}}}"));
    }

    let mut taps: Vec<&Tap> = Vec::new();
    let mut holds: Vec<&Hold> = Vec::new();
    let mut touch_taps: Vec<&TouchTap> = Vec::new();
    let mut touch_holds: Vec<&TouchHold> = Vec::new();
    let mut slides: Vec<&Slide> = Vec::new();
    for note in &group.notes {
        match note {
            Note::Tap(tap) => taps.push(tap),
            Note::Hold(hold) => holds.push(hold),
            Note::Slide(slide) => slides.push(slide),
            Note::TouchTap(touch) => touch_taps.push(touch),
            Note::TouchHold(touch) => touch_holds.push(touch),
        }
    }
    slides.sort_by(|a, b| {
        (a.position, a.end_position, a.pattern.symbol()).cmp(&(
            b.position,
            b.end_position,
            b.pattern.symbol(),
        ))
    });
    let slide_lanes: BTreeSet<u8> = slides.iter().map(|slide| slide.position).collect();

    let mut body = String::new();
    for tap in &taps {
        // Stars with a slide become that slide's head
        if tap.kind.is_star() && slide_lanes.contains(&tap.position) {
            continue;
        }
        let suffix = match tap.kind {
            TapKind::Normal => "",
            TapKind::Break => "b",
            TapKind::Ex => "x",
            TapKind::Star => "$",
            TapKind::BreakStar => "b$",
            TapKind::ExStar => "x$",
        };
        separate(&mut body);
        body.push_str(&format!("{}{}", tap.position + 1, suffix));
    }

    for hold in &holds {
        let modifier = match hold.kind {
            HoldKind::Normal => "h",
            HoldKind::Ex => "hx",
        };
        separate(&mut body);
        body.push_str(&format!(
            "{}{}[{}]",
            hold.position + 1,
            modifier,
            duration_ratio(hold.duration, max_denominator)
        ));
    }

    for touch in &touch_taps {
        separate(&mut body);
        body.push_str(&format!(
            "{}{}{}",
            touch.zone.as_char(),
            touch.position + 1,
            if touch.is_firework { "f" } else { "" }
        ));
    }

    for touch in &touch_holds {
        separate(&mut body);
        body.push_str(&format!(
            "{}{}[{}]",
            touch.zone.as_char(),
            if touch.is_firework { "hf" } else { "h" },
            duration_ratio(touch.duration, max_denominator)
        ));
    }

    let mut started_lanes = BTreeSet::new();
    for slide in &slides {
        if started_lanes.insert(slide.position) {
            let head = match taps.iter().find(|tap| tap.position == slide.position) {
                None => "?",
                Some(tap) => match tap.kind {
                    TapKind::BreakStar => "b",
                    TapKind::ExStar => "x",
                    _ => "",
                },
            };
            separate(&mut body);
            body.push_str(&format!("{}{}", slide.position + 1, head));
        } else {
            body.push('*');
        }

        body.push_str(&slide.pattern.notation(slide.reflect_position)?);
        body.push_str(&(slide.end_position + 1).to_string());
        body.push_str(&slide_duration(slide, bpm, max_denominator)?);
    }

    result.push_str(&body);
    Ok(())
}

/// Bracketed duration of a slide. A non-default delay is expressed by
/// rescaling to the tempo at which the delay would be a quarter measure.
fn slide_duration(slide: &Slide, bpm: Option<f64>, max_denominator: u64) -> Result<String> {
    if slide.delay == DEFAULT_SLIDE_DELAY {
        return Ok(format!(
            "[{}]",
            duration_ratio(slide.duration, max_denominator)
        ));
    }
    if slide.delay <= 0.0 {
        return Err(SimaiError::NotPositive {
            what: "slide delay",
            value: slide.delay,
        });
    }
    let bpm = bpm.ok_or(SimaiError::NoStartingTempo)?;
    let scale = DEFAULT_SLIDE_DELAY / slide.delay;
    let equivalent_bpm = round_measure(bpm * scale);
    Ok(format!(
        "[{:.2}#{}]",
        equivalent_bpm,
        duration_ratio(slide.duration * scale, max_denominator)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{SlidePattern, TouchZone};

    fn chart_with_tempo() -> Chart {
        let mut chart = Chart::new();
        chart.set_tempo(1.0, 120.0).unwrap();
        chart
    }

    fn encode(chart: &Chart) -> String {
        SimaiEncoder::new().encode(chart).unwrap()
    }

    #[test]
    fn test_single_tap() {
        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::Normal).unwrap();
        assert_eq!(encode(&chart), "(120)1,\nE");
    }

    #[test]
    fn test_half_measure_gap() {
        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::Normal).unwrap();
        chart.add_tap(1.5, 1, TapKind::Normal).unwrap();
        assert_eq!(encode(&chart), "(120){2}1,2,\nE");
    }

    #[test]
    fn test_whole_measures_then_sub_beat() {
        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::Normal).unwrap();
        chart.add_tap(3.5, 1, TapKind::Normal).unwrap();
        assert_eq!(encode(&chart), "(120){1}1,,{2},\n2,\nE");
    }

    #[test]
    fn test_line_break_per_measure() {
        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::Normal).unwrap();
        chart.add_tap(2.0, 1, TapKind::Normal).unwrap();
        chart.add_tap(2.5, 2, TapKind::Normal).unwrap();
        assert_eq!(encode(&chart), "(120){1}1,\n{2}2,3,\nE");

        let encoder = SimaiEncoder::with_options(ExportOptions {
            measure_line_breaks: false,
            ..Default::default()
        });
        assert_eq!(encoder.encode(&chart).unwrap(), "(120){1}1,{2}2,3,\nE");
    }

    #[test]
    fn test_tap_suffixes() {
        let mut chart = chart_with_tempo();
        for (position, kind) in [
            TapKind::Normal,
            TapKind::Break,
            TapKind::Ex,
            TapKind::Star,
            TapKind::BreakStar,
            TapKind::ExStar,
        ]
        .into_iter()
        .enumerate()
        {
            chart.add_tap(1.0, position as u8, kind).unwrap();
        }
        assert_eq!(encode(&chart), "(120)1/2b/3x/4$/5b$/6x$,\nE");
    }

    #[test]
    fn test_fragment_order_and_slide_heads() {
        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::BreakStar).unwrap();
        chart.add_slide(Slide::new(1.0, 0, 4, SlidePattern::Straight, None, 0.25, 0.25).unwrap());
        chart.add_slide(Slide::new(1.0, 0, 2, SlidePattern::ArcRight, None, 0.125, 0.25).unwrap());
        chart.add_slide(Slide::new(1.0, 1, 5, SlidePattern::Straight, None, 0.25, 0.25).unwrap());
        chart.add_hold(1.0, 2, 0.5, HoldKind::Normal).unwrap();
        chart.add_touch_tap(1.0, 2, TouchZone::B, true).unwrap();
        chart
            .add_touch_hold(1.0, 0, TouchZone::C, 0.5, false)
            .unwrap();

        assert_eq!(
            encode(&chart),
            "(120){2}3h[2:1]/B3f/Ch[2:1]/1b>3[8:1]*-5[4:1]/2?-6[4:1],,\nE"
        );
    }

    #[test]
    fn test_ex_star_head() {
        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::ExStar).unwrap();
        chart.add_slide(Slide::new(1.0, 0, 4, SlidePattern::Straight, None, 0.25, 0.25).unwrap());
        assert_eq!(encode(&chart), "(120){2}1x-5[4:1],,\nE");
    }

    #[test]
    fn test_tapless_chain_reads_back_without_star() {
        let mut chart = chart_with_tempo();
        chart.add_slide(Slide::new(1.0, 0, 2, SlidePattern::Straight, None, 0.25, 0.25).unwrap());
        chart.add_slide(Slide::new(1.0, 0, 4, SlidePattern::Straight, None, 0.25, 0.25).unwrap());

        let text = encode(&chart);
        assert_eq!(text, "(120){2}1?-3[4:1]*-5[4:1],,\nE");
        let decoded = crate::SimaiDecoder::new().decode_str(&text).unwrap();
        assert_eq!(decoded, chart);
    }

    #[test]
    fn test_shift_out_of_range_is_rejected() {
        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::Normal).unwrap();
        chart.shift(f64::INFINITY);
        assert!(matches!(
            SimaiEncoder::new().encode(&chart),
            Err(SimaiError::OutOfRange { .. })
        ));

        let mut chart = chart_with_tempo();
        chart.add_tap(1.0, 0, TapKind::Normal).unwrap();
        chart.shift(20_000.0);
        assert!(matches!(
            SimaiEncoder::new().encode(&chart),
            Err(SimaiError::OutOfRange {
                what: "note measure",
                ..
            })
        ));
    }

    #[test]
    fn test_delayed_slide_uses_equivalent_bpm() {
        let mut chart = chart_with_tempo();
        chart.add_slide(Slide::new(1.0, 0, 4, SlidePattern::Reflect, Some(2), 0.5, 0.5).unwrap());
        assert_eq!(encode(&chart), "(120){1}1?V35[60.00#4:1],,\nE");
    }

    #[test]
    fn test_hold_extends_final_rest() {
        let mut chart = chart_with_tempo();
        chart.add_hold(1.0, 0, 0.75, HoldKind::Ex).unwrap();
        assert_eq!(encode(&chart), "(120){4}1hx[4:3],,,,\nE");
    }

    #[test]
    fn test_tempo_required_at_start() {
        let chart = Chart::new();
        assert_eq!(SimaiEncoder::new().encode(&chart), Err(SimaiError::NoTempo));

        let mut chart = Chart::new();
        chart.set_tempo(2.0, 150.0).unwrap();
        assert_eq!(
            SimaiEncoder::new().encode(&chart),
            Err(SimaiError::NoStartingTempo)
        );
    }

    #[test]
    fn test_duplicate_tempo_is_rejected() {
        let mut chart = chart_with_tempo();
        chart.set_tempo(1.0, 120.0).unwrap();
        assert_eq!(
            SimaiEncoder::new().encode(&chart),
            Err(SimaiError::DuplicateTempo(1.0))
        );
    }

    #[test]
    fn test_zero_delay_slide_is_rejected() {
        let mut chart = chart_with_tempo();
        chart.add_slide(Slide::new(1.0, 0, 4, SlidePattern::Straight, None, 0.5, 0.0).unwrap());
        assert!(matches!(
            SimaiEncoder::new().encode(&chart),
            Err(SimaiError::NotPositive {
                what: "slide delay",
                ..
            })
        ));
    }

    #[test]
    fn test_fractional_tempo() {
        let mut chart = Chart::new();
        chart.set_tempo(1.0, 150.5).unwrap();
        chart.add_tap(1.0, 7, TapKind::Normal).unwrap();
        assert_eq!(encode(&chart), "(150.5)8,\nE");
    }
}
