//! Magnitude-frame sources.
//!
//! The engine pulls one frame of byte magnitudes per tick from a
//! [`MagnitudeSource`]. The frame borrows the source, so it cannot outlive the
//! tick that read it.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Pull-based provider of per-bin magnitudes (0-255)
pub trait MagnitudeSource {
    /// Number of frequency bins in each frame (0 when unavailable)
    fn bin_count(&self) -> usize;

    /// Refresh and return the current frame, or `None` when no audio is available
    fn read_frame(&mut self) -> Option<&[u8]>;
}

/// A fixed frame, useful for headless hosts and tests
impl MagnitudeSource for Vec<u8> {
    fn bin_count(&self) -> usize {
        self.len()
    }

    fn read_frame(&mut self) -> Option<&[u8]> {
        if self.is_empty() {
            None
        } else {
            Some(self.as_slice())
        }
    }
}

/// Default FFT size; gives 1024 bins
pub const DEFAULT_FFT_SIZE: usize = 2048;
/// Per-bin temporal smoothing between frames
const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
/// Decibel range mapped onto 0-255
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Turns time-domain samples into byte magnitudes, analyser-node style:
/// Blackman window, FFT, temporal smoothing, dB scaling onto 0-255.
pub struct FftMagnitudeSource {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Most recent `fft_size` samples, oldest first
    samples: Vec<f32>,
    window: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
    dirty: bool,
}

impl FftMagnitudeSource {
    pub fn new() -> Self {
        Self::with_fft_size(DEFAULT_FFT_SIZE)
    }

    /// `fft_size` is rounded up to a power of two (minimum 32)
    pub fn with_fft_size(fft_size: usize) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Blackman window
        let n = fft_size as f32;
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let t = 2.0 * std::f32::consts::PI * i as f32 / n;
                0.42 - 0.5 * t.cos() + 0.08 * (2.0 * t).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            samples: vec![0.0; fft_size],
            window,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            bytes: vec![0; fft_size / 2],
            dirty: true,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Append mono samples, keeping only the newest `fft_size`
    pub fn push_samples(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        if samples.len() >= self.fft_size {
            let start = samples.len() - self.fft_size;
            self.samples.copy_from_slice(&samples[start..]);
        } else {
            self.samples.rotate_left(samples.len());
            let start = self.fft_size - samples.len();
            self.samples[start..].copy_from_slice(samples);
        }
        self.dirty = true;
    }

    fn compute(&mut self) {
        for (slot, (&sample, &w)) in self
            .fft_buffer
            .iter_mut()
            .zip(self.samples.iter().zip(self.window.iter()))
        {
            let s = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(s * w, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let scale = 1.0 / self.fft_size as f32;
        let range = MAX_DB - MIN_DB;
        for (i, (smoothed, byte)) in self
            .smoothed
            .iter_mut()
            .zip(self.bytes.iter_mut())
            .enumerate()
        {
            let magnitude = self.fft_buffer[i].norm() * scale;
            *smoothed =
                SMOOTHING_TIME_CONSTANT * *smoothed + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            let db = 20.0 * smoothed.max(1e-10).log10();
            let normalized = ((db - MIN_DB) / range).clamp(0.0, 1.0);
            *byte = (normalized * 255.0) as u8;
        }

        self.dirty = false;
    }
}

impl Default for FftMagnitudeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MagnitudeSource for FftMagnitudeSource {
    fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn read_frame(&mut self) -> Option<&[u8]> {
        if self.dirty {
            self.compute();
        }
        Some(&self.bytes)
    }
}
