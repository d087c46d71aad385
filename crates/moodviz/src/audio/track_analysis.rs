//! Deep-analysis metadata for the current track.
//!
//! Analysis payloads come from outside the engine and are loosely typed:
//! numbers may arrive as strings, ratios as percentages, fields may be
//! missing. Everything is normalized once, here, into a fully-defaulted
//! [`TrackAnalysis`]; nothing downstream deals with optional payload fields.

use serde_json::{Map, Value};

use crate::error::Result;

/// Accepted tempo range; anything outside is treated as unknown
const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;
const DEFAULT_LOUDNESS_DB: f32 = -14.0;

/// Coarse per-band energy summary from offline analysis (0-1 each)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackBands {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

/// Normalized track analysis
#[derive(Clone, Debug, PartialEq)]
pub struct TrackAnalysis {
    pub bpm: Option<f32>,
    pub energy: f32,
    pub danceability: f32,
    pub valence: f32,
    /// Integrated loudness in dB
    pub loudness: f32,
    /// Lowercased, trimmed mood label
    pub mood: Option<String>,
    pub frequency_bands: Option<TrackBands>,
}

impl Default for TrackAnalysis {
    fn default() -> Self {
        Self {
            bpm: None,
            energy: 0.5,
            danceability: 0.5,
            valence: 0.5,
            loudness: DEFAULT_LOUDNESS_DB,
            mood: None,
            frequency_bands: None,
        }
    }
}

/// Accepted spellings per field, in order of preference
const BPM_KEYS: &[&str] = &["bpm", "tempo", "BPM"];
const ENERGY_KEYS: &[&str] = &["energy"];
const DANCEABILITY_KEYS: &[&str] = &["danceability"];
const VALENCE_KEYS: &[&str] = &["valence", "positivity"];
const LOUDNESS_KEYS: &[&str] = &["loudness"];
const MOOD_KEYS: &[&str] = &["mood"];
const BANDS_KEYS: &[&str] = &["frequencyBands", "frequency_bands", "bands"];

/// First spelling of a field that normalizes cleanly
fn lookup<T>(
    map: &Map<String, Value>,
    keys: &[&str],
    parse: fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter().filter_map(|key| map.get(*key)).find_map(parse)
}

/// Number or numeric string
fn as_number(value: &Value) -> Option<f32> {
    let n = match value {
        Value::Number(n) => n.as_f64()? as f32,
        Value::String(s) => s.trim().parse::<f32>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Ratio in 0-1; values in (1, 100] are read as percentages
fn as_ratio(value: &Value) -> Option<f32> {
    let n = as_number(value)?;
    let n = if n > 1.0 && n <= 100.0 { n / 100.0 } else { n };
    Some(n.clamp(0.0, 1.0))
}

fn as_bpm(value: &Value) -> Option<f32> {
    as_number(value).filter(|bpm| (MIN_BPM..=MAX_BPM).contains(bpm))
}

fn as_mood(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_lowercase())
}

fn as_bands(value: &Value) -> Option<TrackBands> {
    match value {
        Value::Object(map) => {
            let get = |key: &str| map.get(key).and_then(as_ratio);
            let bands = TrackBands {
                bass: get("bass")?,
                mid: get("mid").or_else(|| get("mids"))?,
                treble: get("treble").or_else(|| get("high"))?,
            };
            Some(bands)
        }
        Value::Array(items) if items.len() >= 3 => Some(TrackBands {
            bass: as_ratio(&items[0])?,
            mid: as_ratio(&items[1])?,
            treble: as_ratio(&items[2])?,
        }),
        _ => None,
    }
}

impl TrackAnalysis {
    /// Parse a JSON payload. Only malformed JSON is an error; bad fields
    /// fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(value))
    }

    /// Normalize an already-parsed payload. Each field is read on its own,
    /// so one bad or duplicated field never discards the rest.
    pub fn from_value(value: Value) -> Self {
        let defaults = Self::default();
        let Value::Object(map) = value else {
            return defaults;
        };

        Self {
            bpm: lookup(&map, BPM_KEYS, as_bpm),
            energy: lookup(&map, ENERGY_KEYS, as_ratio).unwrap_or(defaults.energy),
            danceability: lookup(&map, DANCEABILITY_KEYS, as_ratio)
                .unwrap_or(defaults.danceability),
            valence: lookup(&map, VALENCE_KEYS, as_ratio).unwrap_or(defaults.valence),
            loudness: lookup(&map, LOUDNESS_KEYS, as_number)
                .map(|db| db.clamp(-60.0, 0.0))
                .unwrap_or(defaults.loudness),
            mood: lookup(&map, MOOD_KEYS, as_mood),
            frequency_bands: lookup(&map, BANDS_KEYS, as_bands),
        }
    }
}
