use crate::error::Result;

/// One event produced by tokenizing a fragment.
///
/// Lane numbers are 0-based. Modifiers are kept as written so the decoder
/// can reject ones it does not understand.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Tempo(f64),
    Divisor(u32),
    Tap {
        button: u8,
        modifier: Option<String>,
    },
    Hold {
        button: u8,
        modifier: Option<String>,
        /// Length in measures
        duration: f64,
    },
    Slide(SlideRecord),
    TouchTap {
        /// Zone letter plus optional 1-based index, e.g. `B3` or `C`
        location: String,
        modifier: Option<String>,
    },
    TouchHold {
        location: String,
        modifier: Option<String>,
        duration: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideRecord {
    pub start_button: u8,
    pub end_button: u8,
    pub modifier: Option<String>,
    pub pattern: String,
    pub reflect_position: Option<u8>,
    /// Length in measures at `equivalent_bpm` when that is set
    pub duration: f64,
    pub equivalent_bpm: Option<f64>,
}

/// Splits one comma-delimited fragment into records.
pub trait FragmentTokenizer {
    fn tokenize(&self, fragment: &str) -> Result<Vec<Record>>;
}

impl<T: FragmentTokenizer + ?Sized> FragmentTokenizer for &T {
    fn tokenize(&self, fragment: &str) -> Result<Vec<Record>> {
        (**self).tokenize(fragment)
    }
}
