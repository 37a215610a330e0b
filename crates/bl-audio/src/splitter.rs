use std::ops::Range;
use std::slice::ChunksExact;

use bl_core::CoreError;

use crate::aggregator::Bin;

/// Split `spectrum` into `band_count` equal, contiguous bands in index order.
///
/// Band `i` covers `[i * size, (i + 1) * size)` with `size = len / band_count`.
/// Borrowing iterator, no allocation.
///
/// # Errors
/// Returns [`CoreError`] if `band_count` is zero or does not divide the
/// spectrum length. A validated `DetectorConfig` rules both out.
///
/// # Example
/// ```
/// use bl_audio::splitter::split_bands;
/// use realfft::num_complex::Complex;
/// let spectrum = vec![Complex::new(0.0f32, 0.0); 16];
/// let bands: Vec<_> = split_bands(&spectrum, 4).unwrap().collect();
/// assert_eq!(bands.len(), 4);
/// assert!(bands.iter().all(|b| b.len() == 4));
/// ```
pub fn split_bands(spectrum: &[Bin], band_count: usize) -> Result<ChunksExact<'_, Bin>, CoreError> {
    let size = band_size(spectrum.len(), band_count)?;
    Ok(spectrum.chunks_exact(size))
}

/// Index range of band `index` for a spectrum of `len` bins.
///
/// # Errors
/// Same conditions as [`split_bands`], plus an out-of-range `index`.
pub fn band_range(len: usize, band_count: usize, index: usize) -> Result<Range<usize>, CoreError> {
    let size = band_size(len, band_count)?;
    if index >= band_count {
        return Err(CoreError::Config(format!(
            "band index {index} out of range for {band_count} bands"
        )));
    }
    Ok(index * size..(index + 1) * size)
}

fn band_size(len: usize, band_count: usize) -> Result<usize, CoreError> {
    if band_count == 0 {
        return Err(CoreError::BandCount { count: band_count });
    }
    if len == 0 || !len.is_multiple_of(band_count) {
        return Err(CoreError::BandMismatch {
            window: len,
            bands: band_count,
        });
    }
    Ok(len / band_count)
}
