// simai chart model: notation parser and exporter, slide geometry, timing

mod chart;
mod config;
mod error;
mod export;
mod note;
mod parse;
mod record;
pub mod rest;
pub mod slide;
pub mod time;
mod tokenize;

pub use chart::Chart;
pub use config::{ExportOptions, ParseOptions, SimaiConfig};
pub use error::{Result, SimaiError};
pub use export::SimaiEncoder;
pub use note::{
    DEFAULT_SLIDE_DELAY, Hold, HoldKind, LANE_COUNT, MAX_MEASURE, Note, Slide, SlidePattern, Tap,
    TapKind, TempoMarker, TouchHold, TouchTap, TouchZone, round_measure,
};
pub use parse::SimaiDecoder;
pub use record::{FragmentTokenizer, Record, SlideRecord};
pub use tokenize::SimaiTokenizer;
