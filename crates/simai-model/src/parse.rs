use std::collections::BTreeSet;

use log::{debug, warn};

use crate::chart::Chart;
use crate::config::ParseOptions;
use crate::error::{Result, SimaiError};
use crate::note::{DEFAULT_SLIDE_DELAY, HoldKind, Slide, SlidePattern, TapKind, TouchZone};
use crate::record::{FragmentTokenizer, Record, SlideRecord};
use crate::tokenize::SimaiTokenizer;

const TAP_MODIFIERS: &[char] = &['b', 'x', '$'];

/// Simai chart text decoder.
///
/// Fragments are split on commas and handed to the tokenizer one at a time;
/// each fragment after the first sits `1 / divisor` measures after the last.
pub struct SimaiDecoder<T = SimaiTokenizer> {
    tokenizer: T,
    options: ParseOptions,
}

/// Running position while walking the fragments
#[derive(Debug, Clone, Copy)]
struct ParseState {
    bpm: f64,
    divisor: u32,
    measure: f64,
}

impl ParseState {
    fn new(options: &ParseOptions) -> Self {
        Self {
            bpm: options.initial_bpm,
            divisor: options.initial_divisor,
            measure: 1.0,
        }
    }

    fn advance(&mut self) {
        self.measure += 1.0 / f64::from(self.divisor);
    }
}

impl SimaiDecoder {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self::with_tokenizer(SimaiTokenizer, options)
    }
}

impl Default for SimaiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FragmentTokenizer> SimaiDecoder<T> {
    pub fn with_tokenizer(tokenizer: T, options: ParseOptions) -> Self {
        Self { tokenizer, options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn decode_str(&self, content: &str) -> Result<Chart> {
        if self.options.initial_divisor == 0 {
            return Err(SimaiError::NotPositive {
                what: "divisor",
                value: 0.0,
            });
        }

        // Whitespace carries no meaning anywhere in the notation
        let content: String = content.split_whitespace().collect();
        let mut chart = Chart::new();
        let mut state = ParseState::new(&self.options);
        let mut fragment_count = 0;
        let mut skipped = 0;

        for (index, fragment) in content.split(',').enumerate() {
            if fragment == "E" {
                break;
            }
            fragment_count += 1;
            if fragment.is_empty() {
                state.advance();
                continue;
            }

            let checkpoint = (chart.note_count(), chart.tempo_markers().len(), state);
            if let Err(source) = self.apply_fragment(fragment, &mut state, &mut chart) {
                let err = SimaiError::Fragment {
                    index,
                    fragment: fragment.to_string(),
                    source: Box::new(source),
                };
                if !self.options.skip_invalid_fragments {
                    return Err(err);
                }
                warn!("Skipping {err}");
                let (note_count, tempo_count, saved) = checkpoint;
                chart.truncate(note_count, tempo_count);
                state = saved;
                skipped += 1;
            }
            state.advance();
        }

        debug!(
            "Decoded {} notes and {} tempo changes from {} fragments ({} skipped)",
            chart.note_count(),
            chart.tempo_markers().len(),
            fragment_count,
            skipped
        );
        Ok(chart)
    }

    fn apply_fragment(&self, fragment: &str, state: &mut ParseState, chart: &mut Chart) -> Result<()> {
        // Lanes that already have a star head in this fragment
        let mut star_positions = BTreeSet::new();

        for record in self.tokenizer.tokenize(fragment)? {
            let measure = state.measure;
            match record {
                Record::Tempo(bpm) => {
                    chart.set_tempo(measure, bpm)?;
                    state.bpm = bpm;
                }
                Record::Divisor(divisor) => {
                    if divisor == 0 {
                        return Err(SimaiError::NotPositive {
                            what: "divisor",
                            value: 0.0,
                        });
                    }
                    state.divisor = divisor;
                }
                Record::Tap { button, modifier } => {
                    chart.add_tap(measure, button, tap_kind(modifier.as_deref())?)?;
                }
                Record::Hold {
                    button,
                    modifier,
                    duration,
                } => {
                    let kind = match modifier.as_deref() {
                        None => HoldKind::Normal,
                        Some("x") => HoldKind::Ex,
                        Some(other) => {
                            return Err(SimaiError::UnknownModifier {
                                note: "hold",
                                modifier: other.to_string(),
                            });
                        }
                    };
                    chart.add_hold(measure, button, duration, kind)?;
                }
                Record::Slide(slide) => {
                    apply_slide(slide, state, &mut star_positions, chart)?;
                }
                Record::TouchTap { location, modifier } => {
                    let (zone, position) = touch_location(&location)?;
                    let is_firework = touch_firework(modifier.as_deref())?;
                    chart.add_touch_tap(measure, position, zone, is_firework)?;
                }
                Record::TouchHold {
                    location,
                    modifier,
                    duration,
                } => {
                    let (zone, position) = touch_location(&location)?;
                    let is_firework = touch_firework(modifier.as_deref())?;
                    chart.add_touch_hold(measure, position, zone, duration, is_firework)?;
                }
            }
        }
        Ok(())
    }
}

fn tap_kind(modifier: Option<&str>) -> Result<TapKind> {
    let modifier = modifier.unwrap_or_default();
    if let Some(bad) = modifier.chars().find(|c| !TAP_MODIFIERS.contains(c)) {
        return Err(SimaiError::UnknownModifier {
            note: "tap",
            modifier: bad.to_string(),
        });
    }
    let is_break = modifier.contains('b');
    let is_ex = !is_break && modifier.contains('x');
    let is_star = modifier.contains('$');
    Ok(TapKind::from_flags(is_break, is_star, is_ex))
}

fn apply_slide(
    slide: SlideRecord,
    state: &ParseState,
    star_positions: &mut BTreeSet<u8>,
    chart: &mut Chart,
) -> Result<()> {
    let (is_break, is_ex, is_tapless) = match slide.modifier.as_deref() {
        None => (false, false, false),
        Some("b") => (true, false, false),
        Some("x") => (false, true, false),
        // `?` and `$` start without a star, `!` also hides the path
        Some("?" | "!" | "$") => (false, false, true),
        Some(other) => {
            return Err(SimaiError::UnknownModifier {
                note: "slide",
                modifier: other.to_string(),
            });
        }
    };

    if !is_tapless && !star_positions.contains(&slide.start_button) {
        chart.add_tap(
            state.measure,
            slide.start_button,
            TapKind::from_flags(is_break, true, is_ex),
        )?;
        star_positions.insert(slide.start_button);
    }

    let (duration, delay) = match slide.equivalent_bpm {
        Some(equivalent_bpm) if equivalent_bpm > 0.0 => {
            let scale = state.bpm / equivalent_bpm;
            (slide.duration * scale, DEFAULT_SLIDE_DELAY * scale)
        }
        Some(equivalent_bpm) => {
            return Err(SimaiError::NotPositive {
                what: "equivalent BPM",
                value: equivalent_bpm,
            });
        }
        None => (slide.duration, DEFAULT_SLIDE_DELAY),
    };

    chart.add_slide(Slide::new(
        state.measure,
        slide.start_button,
        slide.end_button,
        SlidePattern::from_symbol(&slide.pattern)?,
        slide.reflect_position,
        duration,
        delay,
    )?);
    Ok(())
}

/// `B3` -> (B, 2); a bare zone letter is index 0.
fn touch_location(location: &str) -> Result<(TouchZone, u8)> {
    let mut chars = location.chars();
    let zone = TouchZone::from_char(chars.next().unwrap_or(' '))?;
    let position = match chars.next() {
        None => 0,
        Some(c) => match c.to_digit(10) {
            Some(digit @ 1..=9) if chars.next().is_none() => (digit - 1) as u8,
            _ => {
                return Err(SimaiError::Syntax {
                    fragment: location.to_string(),
                    offset: 1,
                    message: "touch index must be a single digit 1-8".to_string(),
                });
            }
        },
    };
    Ok((zone, position))
}

fn touch_firework(modifier: Option<&str>) -> Result<bool> {
    match modifier {
        None => Ok(false),
        Some("f") => Ok(true),
        Some(other) => Err(SimaiError::UnknownModifier {
            note: "touch",
            modifier: other.to_string(),
        }),
    }
}
