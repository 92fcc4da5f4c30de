use crate::document::MetaInfo;
use anyhow::{bail, Result};

/// Number of source samples folded into one emitted keyframe.
///
/// Recordings sample at `motionblur_fps` while the scene plays at `fps`; only
/// every `stride`-th sample becomes a keyframe. Strides are integral for every
/// recording the capture mod produces. A fractional stride keeps samples on
/// the truncated stride and places them at `floor(i / stride)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStride(f32);

impl SampleStride {
    pub const ONE: SampleStride = SampleStride(1.0);

    pub fn new(stride: f32) -> Result<Self> {
        if !stride.is_finite() {
            bail!("sample stride must be finite, got {stride}");
        }
        if stride < 1.0 {
            bail!("sample stride must be at least 1, got {stride} (motion blur rate below the scene rate)");
        }
        Ok(Self(stride))
    }

    pub fn from_meta(meta: &MetaInfo) -> Result<Self> {
        if meta.fps() == 0 {
            bail!("fps must be positive");
        }
        Self::new(meta.sample_stride())
    }

    pub fn get(self) -> f32 {
        self.0
    }

    fn modulus(self) -> u32 {
        self.0 as u32
    }

    /// Reduced frame index for source sample `index`, or `None` when the
    /// sample falls between emitted keyframes.
    pub fn reduce(self, index: usize) -> Option<u32> {
        let index = index as u32;
        if index % self.modulus() != 0 {
            return None;
        }
        Some(self.divide(index))
    }

    /// Timeline start of a track whose first sample carries an explicit frame.
    pub fn start_frame(self, explicit_frame: u32) -> u32 {
        self.divide(explicit_frame)
    }

    /// Frames spanned on the reduced timeline by `sample_count` source samples.
    pub fn reduced_len(self, sample_count: usize) -> u32 {
        (0..sample_count).rev().find_map(|index| self.reduce(index)).map_or(0, |last| last + 1)
    }

    fn divide(self, index: u32) -> u32 {
        // f32 cannot hold every u32 frame number
        (f64::from(index) / f64::from(self.0)).floor() as u32
    }
}

impl Default for SampleStride {
    fn default() -> Self {
        Self::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_stride_keeps_multiples() {
        for stride in 1..=6u32 {
            let reducer = SampleStride::new(stride as f32).expect("stride");
            for index in 0..64u32 {
                let expected = (index % stride == 0).then_some(index / stride);
                assert_eq!(reducer.reduce(index as usize), expected, "stride {stride}, index {index}");
            }
        }
    }

    #[test]
    fn start_frame_floors() {
        let reducer = SampleStride::new(4.0).unwrap();
        assert_eq!(reducer.start_frame(0), 0);
        assert_eq!(reducer.start_frame(7), 1);
        assert_eq!(reducer.start_frame(8), 2);
    }

    #[test]
    fn start_frame_is_exact_for_large_frames() {
        assert_eq!(SampleStride::ONE.start_frame(16_777_217), 16_777_217);
        assert_eq!(SampleStride::ONE.start_frame(u32::MAX), u32::MAX);
        assert_eq!(SampleStride::new(2.0).unwrap().start_frame(33_554_435), 16_777_217);
    }

    #[test]
    fn reduced_len_counts_emitted_span() {
        let reducer = SampleStride::new(2.0).unwrap();
        assert_eq!(reducer.reduced_len(0), 0);
        assert_eq!(reducer.reduced_len(1), 1);
        assert_eq!(reducer.reduced_len(10), 5);
        assert_eq!(reducer.reduced_len(11), 6);
        assert_eq!(SampleStride::ONE.reduced_len(10), 10);
    }

    #[test]
    fn fractional_stride_uses_truncated_modulus() {
        let reducer = SampleStride::new(2.5).unwrap();
        assert_eq!(reducer.reduce(2), Some(0));
        assert_eq!(reducer.reduce(3), None);
        assert_eq!(reducer.reduce(4), Some(1));
        assert_eq!(reducer.reduce(6), Some(2));
    }

    #[test]
    fn rejects_sub_unit_strides() {
        assert!(SampleStride::new(0.5).is_err());
        assert!(SampleStride::new(f32::NAN).is_err());
    }
}
