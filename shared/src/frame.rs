/*!
Frame data structure and raw sample decoding.

A frame is one complete captured sample buffer, already converted from
raw ADC bytes to calibrated voltages. Frames are immutable after
creation and are superseded, never merged, by the next capture.
*/

use crate::error::{Result, ScopeError};
use crate::protocol::{ADC_LEVELS, BUFFER_SIZE, FULL_SCALE_VOLTS};
use std::time::SystemTime;

/// One complete captured and decoded sample buffer
#[derive(Debug, Clone)]
pub struct Frame {
    samples: Vec<f32>,
    captured_at: SystemTime,
}

impl Frame {
    /// Decode a raw sample buffer into calibrated voltages.
    ///
    /// Each raw byte maps linearly onto [0, 5) volts as `b * 5 / 256`.
    /// The buffer must contain exactly [`BUFFER_SIZE`] bytes.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() != BUFFER_SIZE {
            return Err(ScopeError::MalformedFrame {
                expected: BUFFER_SIZE,
                actual: raw.len(),
            });
        }

        let samples = raw
            .iter()
            .map(|&b| f32::from(b) * FULL_SCALE_VOLTS / ADC_LEVELS)
            .collect();

        Ok(Self {
            samples,
            captured_at: SystemTime::now(),
        })
    }

    /// Calibrated voltage samples in capture order
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Wall-clock time at which this frame was decoded
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Number of samples in the frame (always [`BUFFER_SIZE`])
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the frame holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Lowest voltage in the frame
    pub fn min_volts(&self) -> f32 {
        self.samples.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Highest voltage in the frame
    pub fn max_volts(&self) -> f32 {
        self.samples
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Mean voltage across the frame
    pub fn mean_volts(&self) -> f32 {
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_linear_mapping() {
        let mut raw = vec![0u8; BUFFER_SIZE];
        raw[0] = 0;
        raw[1] = 128;
        raw[2] = 255;

        let frame = Frame::decode(&raw).unwrap();
        assert_eq!(frame.len(), BUFFER_SIZE);
        assert!((frame.samples()[0] - 0.0).abs() < 1e-6);
        assert!((frame.samples()[1] - 2.5).abs() < 1e-6);
        // 255 maps just below full scale
        assert!((frame.samples()[2] - 255.0 * 5.0 / 256.0).abs() < 1e-6);
        assert!(frame.samples()[2] < FULL_SCALE_VOLTS);
    }

    #[test]
    fn test_decode_preserves_order() {
        let raw: Vec<u8> = (0..BUFFER_SIZE).map(|i| (i % 256) as u8).collect();
        let frame = Frame::decode(&raw).unwrap();
        for (i, &sample) in frame.samples().iter().enumerate() {
            let expected = (i % 256) as f32 * 5.0 / 256.0;
            assert!((sample - expected).abs() < 1e-6, "sample {i} mismatch");
        }
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let short = vec![0u8; BUFFER_SIZE - 1];
        assert!(matches!(
            Frame::decode(&short),
            Err(ScopeError::MalformedFrame {
                expected: BUFFER_SIZE,
                actual,
            }) if actual == BUFFER_SIZE - 1
        ));

        let long = vec![0u8; BUFFER_SIZE + 1];
        assert!(Frame::decode(&long).is_err());
    }

    #[test]
    fn test_frame_statistics() {
        let mut raw = vec![128u8; BUFFER_SIZE];
        raw[0] = 0;
        raw[1] = 255;

        let frame = Frame::decode(&raw).unwrap();
        assert!((frame.min_volts() - 0.0).abs() < 1e-6);
        assert!((frame.max_volts() - 255.0 * 5.0 / 256.0).abs() < 1e-6);
        assert!(frame.mean_volts() > 2.0 && frame.mean_volts() < 3.0);
    }
}
