//! Frequency band extraction.
//!
//! Reduces one magnitude frame (one byte per FFT bin) to seven named band
//! energies plus a few aggregates the rest of the pipeline consumes.

/// Number of named frequency bands
pub const NUM_BANDS: usize = 7;

/// Band boundaries as fractions of the bin range.
/// Sub-bass, Bass, Low-mid, Mid, High-mid, Presence, Brilliance
const BAND_EDGES: [f32; NUM_BANDS + 1] = [0.0, 0.03, 0.12, 0.25, 0.45, 0.65, 0.82, 1.0];

/// Mean magnitude of each band, normalized to 0-1
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergies {
    pub sub_bass: f32,
    pub bass: f32,
    pub low_mid: f32,
    pub mid: f32,
    pub high_mid: f32,
    pub presence: f32,
    pub brilliance: f32,
}

impl BandEnergies {
    pub fn from_array(values: [f32; NUM_BANDS]) -> Self {
        Self {
            sub_bass: values[0],
            bass: values[1],
            low_mid: values[2],
            mid: values[3],
            high_mid: values[4],
            presence: values[5],
            brilliance: values[6],
        }
    }

    pub fn as_array(&self) -> [f32; NUM_BANDS] {
        [
            self.sub_bass,
            self.bass,
            self.low_mid,
            self.mid,
            self.high_mid,
            self.presence,
            self.brilliance,
        ]
    }

    /// Combined sub-bass + bass energy (what the beat detector listens to)
    pub fn low_end(&self) -> f32 {
        (self.sub_bass + self.bass) * 0.5
    }

    /// Low-mid through high-mid
    pub fn mids(&self) -> f32 {
        (self.low_mid + self.mid + self.high_mid) / 3.0
    }

    /// Presence + brilliance
    pub fn treble(&self) -> f32 {
        (self.presence + self.brilliance) * 0.5
    }

    /// Loudest band
    pub fn peak(&self) -> f32 {
        self.as_array().iter().cloned().fold(0.0, f32::max)
    }
}

/// Per-frame result of the analyzer
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spectrum {
    pub bands: BandEnergies,
    /// Mean of every bin, 0-1
    pub volume: f32,
}

/// Half-open bin range `[start, end)` for each band given `bin_count` bins.
pub fn band_ranges(bin_count: usize) -> [(usize, usize); NUM_BANDS] {
    let mut ranges = [(0usize, 0usize); NUM_BANDS];
    for (i, range) in ranges.iter_mut().enumerate() {
        let start = (BAND_EDGES[i] * bin_count as f32).floor() as usize;
        let end = (BAND_EDGES[i + 1] * bin_count as f32).floor() as usize;
        *range = (start.min(bin_count), end.min(bin_count));
    }
    ranges
}

fn mean_normalized(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    sum as f32 / (bins.len() as f32 * 255.0)
}

/// Band energies of a single frame. Pure; zero-width bands yield 0.
pub fn band_energies(frame: &[u8]) -> BandEnergies {
    let ranges = band_ranges(frame.len());
    let mut values = [0.0f32; NUM_BANDS];
    for (value, &(start, end)) in values.iter_mut().zip(ranges.iter()) {
        if end > start {
            *value = mean_normalized(&frame[start..end]);
        }
    }
    BandEnergies::from_array(values)
}

/// Band analyzer with bin ranges cached for the current bin count
pub struct FrequencyAnalyzer {
    bin_count: usize,
    band_bins: [(usize, usize); NUM_BANDS],
}

impl FrequencyAnalyzer {
    pub fn new() -> Self {
        Self {
            bin_count: 0,
            band_bins: [(0, 0); NUM_BANDS],
        }
    }

    /// Analyze one frame. The frame is only borrowed for the call.
    pub fn analyze(&mut self, frame: &[u8]) -> Spectrum {
        if frame.len() != self.bin_count {
            self.bin_count = frame.len();
            self.band_bins = band_ranges(self.bin_count);
        }

        let mut values = [0.0f32; NUM_BANDS];
        for (value, &(start, end)) in values.iter_mut().zip(self.band_bins.iter()) {
            if end > start {
                *value = mean_normalized(&frame[start..end]);
            }
        }

        Spectrum {
            bands: BandEnergies::from_array(values),
            volume: mean_normalized(frame),
        }
    }
}

impl Default for FrequencyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_contiguous_and_cover_all_bins() {
        for n in [0usize, 1, 7, 16, 64, 256, 1024] {
            let ranges = band_ranges(n);
            assert_eq!(ranges[0].0, 0);
            assert_eq!(ranges[NUM_BANDS - 1].1, n);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].1, pair[1].0, "gap between bands for n={}", n);
            }
        }
    }

    #[test]
    fn proportional_boundaries_for_1024_bins() {
        let ranges = band_ranges(1024);
        assert_eq!(ranges[0], (0, 30));
        assert_eq!(ranges[1], (30, 122));
        assert_eq!(ranges[6], (839, 1024));
    }

    #[test]
    fn silence_is_zero() {
        let bands = band_energies(&[0u8; 256]);
        assert_eq!(bands, BandEnergies::default());
    }

    #[test]
    fn full_scale_is_one() {
        let bands = band_energies(&[255u8; 256]);
        for value in bands.as_array() {
            assert!((value - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn bass_only_frame() {
        let mut frame = vec![0u8; 1024];
        // Fill sub-bass and bass bins
        for bin in frame.iter_mut().take(122) {
            *bin = 204;
        }
        let bands = band_energies(&frame);
        assert!((bands.sub_bass - 0.8).abs() < 1e-6);
        assert!((bands.bass - 0.8).abs() < 1e-6);
        assert!((bands.low_end() - 0.8).abs() < 1e-6);
        assert_eq!(bands.treble(), 0.0);
    }

    #[test]
    fn zero_width_band_is_zero_not_nan() {
        // With 16 bins the sub-bass band (0-3%) has no bins at all
        let bands = band_energies(&[255u8; 16]);
        assert_eq!(bands.sub_bass, 0.0);
        assert!(bands.as_array().iter().all(|v| v.is_finite()));
        assert_eq!(band_energies(&[]), BandEnergies::default());
    }

    #[test]
    fn analyzer_tracks_bin_count_changes() {
        let mut analyzer = FrequencyAnalyzer::new();
        let small = analyzer.analyze(&[255u8; 64]);
        assert!((small.volume - 1.0).abs() < 1e-6);

        let large = analyzer.analyze(&vec![0u8; 2048]);
        assert_eq!(large.volume, 0.0);
        assert_eq!(large.bands, BandEnergies::default());
    }
}
