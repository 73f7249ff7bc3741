//! Default tokenizer for the comma-free notation inside one fragment.
//!
//! Accepted forms, with `/` between simultaneous notes:
//!
//! * `(150)` tempo change, `{8}` divisor change
//! * `1`, `1b`, `1x`, `1$`, `1b$`: taps
//! * `1h[4:1]`, `1hx[4:1]`: holds
//! * `1-5[8:1]`, `1?V35[120#4:1]`, `1>5[8:1]*<3[8:1]`: slides
//! * `B3`, `C1f`, `Ch[2:1]`, `Chf[2:1]`: touch notes

use crate::error::{Result, SimaiError};
use crate::record::{FragmentTokenizer, Record, SlideRecord};

const LANE_MODIFIERS: &[u8] = b"bx$?!";
const HOLD_MODIFIERS: &[u8] = b"bx";
const PATTERN_STARTS: &[u8] = b"-^<>pqszvVw";

#[derive(Debug, Clone, Copy, Default)]
pub struct SimaiTokenizer;

impl FragmentTokenizer for SimaiTokenizer {
    fn tokenize(&self, fragment: &str) -> Result<Vec<Record>> {
        Cursor::new(fragment).records()
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

fn non_empty(modifier: String) -> Option<String> {
    if modifier.is_empty() {
        None
    } else {
        Some(modifier)
    }
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> SimaiError {
        SimaiError::Syntax {
            fragment: self.text.to_string(),
            offset,
            message: message.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> SimaiError {
        self.error_at(self.pos, message)
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected as char)))
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn records(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                b'(' => records.push(Record::Tempo(self.tempo()?)),
                b'{' => records.push(Record::Divisor(self.divisor()?)),
                b'/' => self.pos += 1,
                b'1'..=b'8' => self.lane_note(&mut records)?,
                b'A'..=b'E' => records.push(self.touch_note()?),
                _ => {
                    let found = self.text[self.pos..].chars().next().unwrap_or_default();
                    return Err(self.error(format!("unexpected character {found:?}")));
                }
            }
        }
        Ok(records)
    }

    fn tempo(&mut self) -> Result<f64> {
        self.expect(b'(')?;
        let start = self.pos;
        let body = self.take_while(|b| b != b')');
        self.expect(b')')?;
        match body.parse::<f64>() {
            Ok(bpm) if bpm.is_finite() => Ok(bpm),
            _ => Err(self.error_at(start, format!("invalid BPM {body:?}"))),
        }
    }

    fn divisor(&mut self) -> Result<u32> {
        self.expect(b'{')?;
        let start = self.pos;
        let body = self.take_while(|b| b != b'}');
        self.expect(b'}')?;
        body.parse()
            .map_err(|_| self.error_at(start, format!("invalid divisor {body:?}")))
    }

    fn lane(&mut self) -> Result<u8> {
        match self.peek() {
            Some(c @ b'1'..=b'8') => {
                self.pos += 1;
                Ok(c - b'1')
            }
            _ => Err(self.error("expected a button number 1-8")),
        }
    }

    /// `[den:num]` or `[bpm#den:num]`, as `(num / den, bpm)`.
    fn duration(&mut self) -> Result<(f64, Option<f64>)> {
        let start = self.pos;
        self.expect(b'[')?;
        let body = self.take_while(|b| b != b']');
        self.expect(b']')?;

        let (bpm, ratio) = match body.split_once('#') {
            Some((bpm, ratio)) => {
                match bpm.parse::<f64>() {
                    Ok(value) if value.is_finite() => (Some(value), ratio),
                    _ => return Err(self.error_at(start, format!("invalid BPM {bpm:?}"))),
                }
            }
            None => (None, body),
        };
        let (den, num) = ratio
            .split_once(':')
            .ok_or_else(|| self.error_at(start, format!("expected [den:num], got {body:?}")))?;
        let den: u32 = den
            .parse()
            .map_err(|_| self.error_at(start, format!("invalid denominator {den:?}")))?;
        let num: u32 = num
            .parse()
            .map_err(|_| self.error_at(start, format!("invalid numerator {num:?}")))?;
        if den == 0 {
            return Err(self.error_at(start, "denominator is zero"));
        }
        Ok((f64::from(num) / f64::from(den), bpm))
    }

    fn lane_note(&mut self, records: &mut Vec<Record>) -> Result<()> {
        let start = self.pos;
        let button = self.lane()?;
        let mut modifier = self
            .take_while(|b| LANE_MODIFIERS.contains(&b))
            .to_string();

        match self.peek() {
            Some(b'h') => {
                self.pos += 1;
                modifier.push_str(self.take_while(|b| HOLD_MODIFIERS.contains(&b)));
                let (duration, bpm) = self.duration()?;
                if bpm.is_some() {
                    return Err(self.error_at(start, "holds do not take an equivalent BPM"));
                }
                records.push(Record::Hold {
                    button,
                    modifier: non_empty(modifier),
                    duration,
                });
            }
            Some(c) if PATTERN_STARTS.contains(&c) => {
                // every segment after `*` shares the head written before the first
                let head = non_empty(modifier);
                records.push(Record::Slide(self.slide_segment(button, head.clone())?));
                while self.eat(b'*') {
                    records.push(Record::Slide(self.slide_segment(button, head.clone())?));
                }
            }
            _ => records.push(Record::Tap {
                button,
                modifier: non_empty(modifier),
            }),
        }
        Ok(())
    }

    fn pattern(&mut self) -> Result<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if PATTERN_STARTS.contains(&c) => {
                self.pos += 1;
                if matches!(c, b'p' | b'q') {
                    self.eat(c);
                }
                Ok(&self.text[start..self.pos])
            }
            _ => Err(self.error("expected a slide pattern")),
        }
    }

    fn slide_segment(&mut self, start_button: u8, modifier: Option<String>) -> Result<SlideRecord> {
        let pattern = self.pattern()?;
        let reflect_position = if pattern == "V" {
            Some(self.lane()?)
        } else {
            None
        };
        let end_button = self.lane()?;
        let (duration, equivalent_bpm) = self.duration()?;
        Ok(SlideRecord {
            start_button,
            end_button,
            modifier,
            pattern: pattern.to_string(),
            reflect_position,
            duration,
            equivalent_bpm,
        })
    }

    fn touch_note(&mut self) -> Result<Record> {
        let start = self.pos;
        let mut location = self.take_while(|b| b.is_ascii_uppercase()).to_string();
        if location.len() != 1 {
            return Err(self.error_at(start, format!("invalid touch zone {location:?}")));
        }
        location.push_str(self.take_while(|b| (b'1'..=b'8').contains(&b)));
        if location.len() > 2 {
            return Err(self.error_at(start, format!("invalid touch location {location:?}")));
        }

        let mut modifier = self.take_while(|b| b == b'f').to_string();
        if self.eat(b'h') {
            modifier.push_str(self.take_while(|b| b == b'f'));
            let (duration, bpm) = self.duration()?;
            if bpm.is_some() {
                return Err(self.error_at(start, "holds do not take an equivalent BPM"));
            }
            Ok(Record::TouchHold {
                location,
                modifier: non_empty(modifier),
                duration,
            })
        } else {
            Ok(Record::TouchTap {
                location,
                modifier: non_empty(modifier),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(fragment: &str) -> Vec<Record> {
        SimaiTokenizer.tokenize(fragment).unwrap()
    }

    fn tap(button: u8, modifier: Option<&str>) -> Record {
        Record::Tap {
            button,
            modifier: modifier.map(str::to_string),
        }
    }

    #[test]
    fn test_tempo_and_divisor() {
        assert_eq!(
            tokenize("(150.5){8}1"),
            vec![Record::Tempo(150.5), Record::Divisor(8), tap(0, None)]
        );
    }

    #[test]
    fn test_taps_with_modifiers() {
        assert_eq!(
            tokenize("1b/2x/3$/4b$"),
            vec![
                tap(0, Some("b")),
                tap(1, Some("x")),
                tap(2, Some("$")),
                tap(3, Some("b$")),
            ]
        );
    }

    #[test]
    fn test_adjacent_digits_are_separate_taps() {
        assert_eq!(tokenize("18"), vec![tap(0, None), tap(7, None)]);
    }

    #[test]
    fn test_hold_modifiers_around_h() {
        assert_eq!(
            tokenize("1h[4:1]/2hx[8:3]/3xh[2:1]"),
            vec![
                Record::Hold {
                    button: 0,
                    modifier: None,
                    duration: 0.25
                },
                Record::Hold {
                    button: 1,
                    modifier: Some("x".to_string()),
                    duration: 0.375
                },
                Record::Hold {
                    button: 2,
                    modifier: Some("x".to_string()),
                    duration: 0.5
                },
            ]
        );
    }

    #[test]
    fn test_slide_chain_shares_start() {
        let records = tokenize("1b-5[8:1]*pp3[60#4:1]");
        assert_eq!(
            records,
            vec![
                Record::Slide(SlideRecord {
                    start_button: 0,
                    end_button: 4,
                    modifier: Some("b".to_string()),
                    pattern: "-".to_string(),
                    reflect_position: None,
                    duration: 0.125,
                    equivalent_bpm: None,
                }),
                Record::Slide(SlideRecord {
                    start_button: 0,
                    end_button: 2,
                    modifier: Some("b".to_string()),
                    pattern: "pp".to_string(),
                    reflect_position: None,
                    duration: 0.25,
                    equivalent_bpm: Some(60.0),
                }),
            ]
        );
    }

    #[test]
    fn test_tapless_head_carries_through_chain() {
        let records = tokenize("1?-5[4:1]*-3[4:1]");
        assert_eq!(records.len(), 2);
        for record in &records {
            let Record::Slide(slide) = record else {
                panic!("expected a slide, got {record:?}");
            };
            assert_eq!(slide.modifier.as_deref(), Some("?"));
        }
    }

    #[test]
    fn test_reflect_slide_reads_reflect_lane() {
        let records = tokenize("1?V35[4:1]");
        let Record::Slide(slide) = &records[0] else {
            panic!("expected a slide, got {records:?}");
        };
        assert_eq!(slide.pattern, "V");
        assert_eq!(slide.reflect_position, Some(2));
        assert_eq!(slide.end_button, 4);
        assert_eq!(slide.modifier.as_deref(), Some("?"));
    }

    #[test]
    fn test_touch_notes() {
        assert_eq!(
            tokenize("B3/C1f/Chf[2:1]/E"),
            vec![
                Record::TouchTap {
                    location: "B3".to_string(),
                    modifier: None
                },
                Record::TouchTap {
                    location: "C1".to_string(),
                    modifier: Some("f".to_string())
                },
                Record::TouchHold {
                    location: "C".to_string(),
                    modifier: Some("f".to_string()),
                    duration: 0.5
                },
                Record::TouchTap {
                    location: "E".to_string(),
                    modifier: None
                },
            ]
        );
    }

    #[test]
    fn test_syntax_errors_report_offset() {
        let err = SimaiTokenizer.tokenize("1/9").unwrap_err();
        assert!(matches!(err, SimaiError::Syntax { offset: 2, .. }), "{err:?}");

        for bad in [
            "1h", "1h[4]", "1-5[0:1]", "1-[4:1]", "(abc)1", "{x}", "1h[120#4:1]", "AB1",
            "(inf)1", "(NaN)1", "1-5[inf#4:1]", "1-5[-inf#4:1]",
        ] {
            assert!(SimaiTokenizer.tokenize(bad).is_err(), "{bad} should fail");
        }
    }
}
