use std::sync::Arc;

use bl_core::config::{DetectorConfig, WindowFunction};
use bl_core::CoreError;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

/// One complex frequency bin.
pub type Bin = Complex<f32>;

/// A full `window_length` spectrum, index order, DC first.
pub type Spectrum = [Bin];

/// Buffers samples into fixed windows and transforms each full window.
///
/// Pre-allocates the FFT plan, the sample window and every output buffer in
/// the constructor: `add` never allocates.
///
/// The real FFT yields `N/2 + 1` bins; the upper half is rebuilt from the
/// conjugate symmetry of a real signal so callers always see the full
/// `N`-bin spectrum.
///
/// # Example
/// ```
/// use bl_audio::aggregator::SampleAggregator;
/// use bl_core::DetectorConfig;
/// let mut agg = SampleAggregator::new(&DetectorConfig::default()).unwrap();
/// for _ in 0..2047 {
///     assert!(agg.add(0.0).is_none());
/// }
/// assert_eq!(agg.add(0.0).map(<[_]>::len), Some(2048));
/// ```
pub struct SampleAggregator {
    window_length: usize,
    /// Samples of the window being filled.
    samples: Vec<f32>,
    /// FFT input, overwritten by the transform.
    input_buf: Vec<f32>,
    half_buf: Vec<Bin>,
    scratch: Vec<Bin>,
    spectrum: Vec<Bin>,
    plan: Arc<dyn RealToComplex<f32>>,
    /// Taper coefficients, `None` for a rectangular window.
    taper: Option<Vec<f32>>,
}

impl SampleAggregator {
    /// Create an aggregator for `config.window_length` samples per window.
    ///
    /// # Errors
    /// Returns [`CoreError`] if the configuration does not validate.
    pub fn new(config: &DetectorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let size = config.window_length;

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let taper = match config.window_function {
            WindowFunction::None => None,
            f => Some((0..size).map(|i| f.coefficient(i, size)).collect()),
        };

        Ok(Self {
            window_length: size,
            samples: Vec::with_capacity(size),
            input_buf: plan.make_input_vec(),
            half_buf: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            spectrum: vec![Complex::new(0.0, 0.0); size],
            plan,
            taper,
        })
    }

    /// Append one sample. Returns the spectrum when this sample completes a
    /// window; the window is then empty again.
    #[inline]
    pub fn add(&mut self, sample: f32) -> Option<&Spectrum> {
        self.samples.push(sample);
        if self.samples.len() < self.window_length {
            return None;
        }
        self.transform();
        self.samples.clear();
        Some(&self.spectrum)
    }

    /// Samples buffered toward the next window.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.samples.len()
    }

    /// Drop a partially filled window.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    #[must_use]
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    fn transform(&mut self) {
        match &self.taper {
            Some(taper) => {
                for ((slot, &s), &w) in self.input_buf.iter_mut().zip(&self.samples).zip(taper) {
                    *slot = s * w;
                }
            }
            None => self.input_buf.copy_from_slice(&self.samples),
        }

        if let Err(e) =
            self.plan
                .process_with_scratch(&mut self.input_buf, &mut self.half_buf, &mut self.scratch)
        {
            log::error!("FFT failed: {e}");
            self.spectrum.fill(Complex::new(0.0, 0.0));
            return;
        }

        let n = self.window_length;
        let half = self.half_buf.len();
        self.spectrum[..half].copy_from_slice(&self.half_buf);
        for k in half..n {
            self.spectrum[k] = self.spectrum[n - k].conj();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(window_length: usize) -> DetectorConfig {
        DetectorConfig {
            window_length,
            band_count: 1,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(matches!(
            SampleAggregator::new(&config(1000)),
            Err(CoreError::WindowLength { length: 1000 })
        ));
        assert!(SampleAggregator::new(&config(0)).is_err());
    }

    #[test]
    fn emits_once_per_window_and_resets() {
        let mut agg = SampleAggregator::new(&config(64)).unwrap();
        let mut emitted = 0;
        for i in 0..64 * 3 + 10 {
            if agg.add(i as f32).is_some() {
                emitted += 1;
                assert_eq!(agg.pending(), 0);
            }
        }
        assert_eq!(emitted, 3);
        assert_eq!(agg.pending(), 10);
        agg.reset();
        assert_eq!(agg.pending(), 0);
    }

    #[test]
    fn sine_lands_in_its_bin_and_mirror() {
        let n = 256;
        let bin = 8;
        let mut agg = SampleAggregator::new(&config(n)).unwrap();
        let mut spectrum = None;
        for i in 0..n {
            let s = (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n as f32).sin();
            if let Some(sp) = agg.add(s) {
                spectrum = Some(sp.to_vec());
            }
        }
        let spectrum = spectrum.unwrap();
        assert_eq!(spectrum.len(), n);

        // sin → purely imaginary peak of N/2 at k and its conjugate at N-k
        let half = n as f32 / 2.0;
        assert!((spectrum[bin].im + half).abs() < 1e-2);
        assert!((spectrum[n - bin].im - half).abs() < 1e-2);
        for (k, v) in spectrum.iter().enumerate() {
            if k != bin && k != n - bin {
                assert!(v.norm() < 1e-2, "leak at bin {k}: {v}");
            }
        }
    }

    #[test]
    fn upper_half_is_conjugate_of_lower_half() {
        let n = 128;
        let mut agg = SampleAggregator::new(&config(n)).unwrap();
        let mut spectrum = Vec::new();
        for i in 0..n {
            let s = ((i * 7919) % 13) as f32 / 13.0 - 0.5;
            if let Some(sp) = agg.add(s) {
                spectrum = sp.to_vec();
            }
        }
        for k in n / 2 + 1..n {
            assert_eq!(spectrum[k], spectrum[n - k].conj());
        }
    }

    #[test]
    fn silence_is_exactly_zero() {
        let mut agg = SampleAggregator::new(&config(512)).unwrap();
        for _ in 0..511 {
            agg.add(0.0);
        }
        let spectrum = agg.add(0.0).unwrap();
        assert!(spectrum.iter().all(|v| v.re == 0.0 && v.im == 0.0));
    }

    #[test]
    fn taper_is_applied() {
        let cfg = DetectorConfig {
            window_function: WindowFunction::Hann,
            ..config(64)
        };
        let mut agg = SampleAggregator::new(&cfg).unwrap();
        let mut dc = 0.0;
        for _ in 0..64 {
            if let Some(sp) = agg.add(1.0) {
                dc = sp[0].re;
            }
        }
        // Σ hann(i) over a symmetric window = (N-1)/2
        assert!((dc - 31.5).abs() < 1e-3, "{dc}");
    }
}
