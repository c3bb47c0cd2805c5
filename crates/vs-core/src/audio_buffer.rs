//! Interleaved sample buffer with a typed backing store.
//!
//! The store is one `Vec` of the native sample type for the buffer's
//! format. The byte view used by hosts (`as_bytes`) is a cast of that
//! store, so `size_in_bytes() == frames() * spec().bytes_per_frame()`
//! always holds.

use alloc::vec;
use alloc::vec::Vec;

use crate::spec::{AudioSpec, ChannelLayout, SampleFormat};

/// One packed 24-bit sample in host byte order.
pub type I24 = [u8; 3];

const U8_SCALE: f64 = 128.0;
const I16_SCALE: f64 = 32768.0;
const I24_SCALE: f64 = 8_388_608.0;
const I32_SCALE: f64 = 2_147_483_648.0;

/// Unpack a 24-bit sample into the low bits of an `i32`.
pub fn i24_to_i32(b: I24) -> i32 {
    let raw = if cfg!(target_endian = "little") {
        i32::from_le_bytes([b[0], b[1], b[2], 0])
    } else {
        i32::from_be_bytes([0, b[0], b[1], b[2]])
    };
    // sign-extend from bit 23
    (raw << 8) >> 8
}

/// Pack the low 24 bits of `v` (already clamped to the 24-bit range).
pub fn i32_to_i24(v: i32) -> I24 {
    if cfg!(target_endian = "little") {
        let b = v.to_le_bytes();
        [b[0], b[1], b[2]]
    } else {
        let b = v.to_be_bytes();
        [b[1], b[2], b[3]]
    }
}

/// Typed sample storage, one variant per `SampleFormat`.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I24(Vec<I24>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl SampleData {
    /// `len` samples of silence in `format`.
    pub fn silent(format: SampleFormat, len: usize) -> Self {
        match format {
            SampleFormat::U8 => SampleData::U8(vec![128; len]),
            SampleFormat::I16 => SampleData::I16(vec![0; len]),
            SampleFormat::I24 => SampleData::I24(vec![[0; 3]; len]),
            SampleFormat::I32 => SampleData::I32(vec![0; len]),
            SampleFormat::F32 => SampleData::F32(vec![0.0; len]),
            SampleFormat::F64 => SampleData::F64(vec![0.0; len]),
        }
    }

    pub fn format(&self) -> SampleFormat {
        match self {
            SampleData::U8(_) => SampleFormat::U8,
            SampleData::I16(_) => SampleFormat::I16,
            SampleData::I24(_) => SampleFormat::I24,
            SampleData::I32(_) => SampleFormat::I32,
            SampleData::F32(_) => SampleFormat::F32,
            SampleData::F64(_) => SampleFormat::F64,
        }
    }

    /// Number of samples (not frames).
    pub fn len(&self) -> usize {
        match self {
            SampleData::U8(v) => v.len(),
            SampleData::I16(v) => v.len(),
            SampleData::I24(v) => v.len(),
            SampleData::I32(v) => v.len(),
            SampleData::F32(v) => v.len(),
            SampleData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SampleData::U8(v) => v.as_slice(),
            SampleData::I16(v) => bytemuck::cast_slice(v),
            SampleData::I24(v) => bytemuck::cast_slice(v),
            SampleData::I32(v) => bytemuck::cast_slice(v),
            SampleData::F32(v) => bytemuck::cast_slice(v),
            SampleData::F64(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            SampleData::U8(v) => v.as_mut_slice(),
            SampleData::I16(v) => bytemuck::cast_slice_mut(v),
            SampleData::I24(v) => bytemuck::cast_slice_mut(v),
            SampleData::I32(v) => bytemuck::cast_slice_mut(v),
            SampleData::F32(v) => bytemuck::cast_slice_mut(v),
            SampleData::F64(v) => bytemuck::cast_slice_mut(v),
        }
    }

    /// Sample `idx` normalised to nominal [-1, 1). Out of range reads 0.
    pub fn get(&self, idx: usize) -> f64 {
        match self {
            SampleData::U8(v) => v.get(idx).map_or(0.0, |&s| (s as f64 - 128.0) / U8_SCALE),
            SampleData::I16(v) => v.get(idx).map_or(0.0, |&s| s as f64 / I16_SCALE),
            SampleData::I24(v) => v.get(idx).map_or(0.0, |&s| i24_to_i32(s) as f64 / I24_SCALE),
            SampleData::I32(v) => v.get(idx).map_or(0.0, |&s| s as f64 / I32_SCALE),
            SampleData::F32(v) => v.get(idx).map_or(0.0, |&s| s as f64),
            SampleData::F64(v) => v.get(idx).copied().unwrap_or(0.0),
        }
    }

    /// Store a normalised value at `idx`. Integer formats round to nearest
    /// and saturate; float formats store the value unclamped.
    pub fn set(&mut self, idx: usize, value: f64) {
        match self {
            SampleData::U8(v) => {
                if let Some(s) = v.get_mut(idx) {
                    *s = quantize_u8(value);
                }
            }
            SampleData::I16(v) => {
                if let Some(s) = v.get_mut(idx) {
                    *s = quantize_i16(value);
                }
            }
            SampleData::I24(v) => {
                if let Some(s) = v.get_mut(idx) {
                    *s = i32_to_i24(quantize_i24(value));
                }
            }
            SampleData::I32(v) => {
                if let Some(s) = v.get_mut(idx) {
                    *s = quantize_i32(value);
                }
            }
            SampleData::F32(v) => {
                if let Some(s) = v.get_mut(idx) {
                    *s = value as f32;
                }
            }
            SampleData::F64(v) => {
                if let Some(s) = v.get_mut(idx) {
                    *s = value;
                }
            }
        }
    }

    /// Flip the polarity of samples `start..end` in place.
    ///
    /// Float formats negate. Integer formats take the one's complement
    /// (`!s`, which is `255 - s` for U8), so the full range including the
    /// most negative value maps onto itself and a second call restores
    /// every bit.
    pub fn invert(&mut self, start: usize, end: usize) {
        let end = end.min(self.len());
        if start >= end {
            return;
        }
        match self {
            SampleData::U8(v) => v[start..end].iter_mut().for_each(|s| *s = !*s),
            SampleData::I16(v) => v[start..end].iter_mut().for_each(|s| *s = !*s),
            SampleData::I24(v) => v[start..end]
                .iter_mut()
                .for_each(|s| *s = i32_to_i24(!i24_to_i32(*s))),
            SampleData::I32(v) => v[start..end].iter_mut().for_each(|s| *s = !*s),
            SampleData::F32(v) => v[start..end].iter_mut().for_each(|s| *s = -*s),
            SampleData::F64(v) => v[start..end].iter_mut().for_each(|s| *s = -*s),
        }
    }
}

fn quantize_u8(value: f64) -> u8 {
    (libm::round(value * U8_SCALE) + 128.0).clamp(0.0, 255.0) as u8
}

fn quantize_i16(value: f64) -> i16 {
    libm::round(value * I16_SCALE).clamp(-I16_SCALE, I16_SCALE - 1.0) as i16
}

fn quantize_i24(value: f64) -> i32 {
    libm::round(value * I24_SCALE).clamp(-I24_SCALE, I24_SCALE - 1.0) as i32
}

fn quantize_i32(value: f64) -> i32 {
    libm::round(value * I32_SCALE).clamp(-I32_SCALE, I32_SCALE - 1.0) as i32
}

/// Decode one sample from `src[..format.bytes_per_sample()]` (host byte
/// order) to its normalised value. Short sources read as 0.
pub fn decode_sample(format: SampleFormat, src: &[u8]) -> f64 {
    let n = format.bytes_per_sample();
    if src.len() < n {
        return 0.0;
    }
    match format {
        SampleFormat::U8 => (src[0] as f64 - 128.0) / U8_SCALE,
        SampleFormat::I16 => i16::from_ne_bytes([src[0], src[1]]) as f64 / I16_SCALE,
        SampleFormat::I24 => i24_to_i32([src[0], src[1], src[2]]) as f64 / I24_SCALE,
        SampleFormat::I32 => i32::from_ne_bytes([src[0], src[1], src[2], src[3]]) as f64 / I32_SCALE,
        SampleFormat::F32 => f32::from_ne_bytes([src[0], src[1], src[2], src[3]]) as f64,
        SampleFormat::F64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(&src[..8]);
            f64::from_ne_bytes(b)
        }
    }
}

/// Encode one normalised sample into `dst[..format.bytes_per_sample()]`
/// using host byte order. Short destinations are left untouched.
pub fn encode_sample(format: SampleFormat, value: f64, dst: &mut [u8]) {
    let n = format.bytes_per_sample();
    if dst.len() < n {
        return;
    }
    match format {
        SampleFormat::U8 => dst[0] = quantize_u8(value),
        SampleFormat::I16 => dst[..n].copy_from_slice(&quantize_i16(value).to_ne_bytes()),
        SampleFormat::I24 => dst[..n].copy_from_slice(&i32_to_i24(quantize_i24(value))),
        SampleFormat::I32 => dst[..n].copy_from_slice(&quantize_i32(value).to_ne_bytes()),
        SampleFormat::F32 => dst[..n].copy_from_slice(&(value as f32).to_ne_bytes()),
        SampleFormat::F64 => dst[..n].copy_from_slice(&value.to_ne_bytes()),
    }
}

/// An interleaved multichannel buffer conforming to an `AudioSpec`.
///
/// `data[frame * channels + ch]` is the sample for channel `ch` at `frame`.
/// All operations are total: requests that do not fit the buffer's spec
/// leave it unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    spec: AudioSpec,
    frames: usize,
    data: SampleData,
}

impl AudioBuffer {
    /// Allocate `frames` frames of silence.
    pub fn new(spec: AudioSpec, frames: usize) -> Self {
        Self {
            spec,
            frames,
            data: SampleData::silent(spec.format, frames * spec.channels()),
        }
    }

    /// Wrap interleaved float samples. A trailing partial frame is dropped.
    pub fn from_interleaved_f32(sample_rate: u32, layout: ChannelLayout, mut samples: Vec<f32>) -> Self {
        let channels = layout.channel_count();
        let frames = samples.len() / channels;
        samples.truncate(frames * channels);
        Self {
            spec: AudioSpec::float(sample_rate, layout),
            frames,
            data: SampleData::F32(samples),
        }
    }

    /// Wrap existing typed data. Returns `None` if the data's format does not
    /// match `spec` or the sample count is not a whole number of frames.
    pub fn from_data(spec: AudioSpec, data: SampleData) -> Option<Self> {
        let channels = spec.channels();
        if data.format() != spec.format || data.len() % channels != 0 {
            return None;
        }
        Some(Self {
            spec,
            frames: data.len() / channels,
            data,
        })
    }

    pub fn spec(&self) -> &AudioSpec {
        &self.spec
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.spec.channels()
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data.as_bytes().len()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.spec.frames_to_seconds(self.frames)
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_bytes_mut()
    }

    /// Interleaved float view, if the buffer is `F32`.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            SampleData::F32(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.data {
            SampleData::F32(v) => Some(v.as_mut_slice()),
            _ => None,
        }
    }

    /// Normalised sample at (`frame`, `ch`). Out of range reads 0.
    pub fn sample(&self, frame: usize, ch: usize) -> f32 {
        if frame >= self.frames || ch >= self.channels() {
            return 0.0;
        }
        self.data.get(frame * self.channels() + ch) as f32
    }

    /// Store a normalised sample at (`frame`, `ch`). Out of range is ignored.
    pub fn set_sample(&mut self, frame: usize, ch: usize, value: f32) {
        if frame >= self.frames || ch >= self.channels() {
            return;
        }
        let channels = self.channels();
        self.data.set(frame * channels + ch, value as f64);
    }

    /// Full-precision read of (`frame`, `ch`). Out of range reads 0.
    pub fn sample_f64(&self, frame: usize, ch: usize) -> f64 {
        if frame >= self.frames || ch >= self.channels() {
            return 0.0;
        }
        self.data.get(frame * self.channels() + ch)
    }

    /// Full-precision write of (`frame`, `ch`). Out of range is ignored.
    pub fn set_sample_f64(&mut self, frame: usize, ch: usize, value: f64) {
        if frame >= self.frames || ch >= self.channels() {
            return;
        }
        let channels = self.channels();
        self.data.set(frame * channels + ch, value);
    }

    /// Flip the polarity of `count` frames from `start`. See
    /// [`SampleData::invert`] for the integer rule.
    pub fn invert_frames(&mut self, start: usize, count: usize) {
        let channels = self.channels();
        let end = start.saturating_add(count).min(self.frames);
        self.data.invert(start * channels, end * channels);
    }

    /// Write the format's silence value into every sample.
    pub fn clear(&mut self) {
        match &mut self.data {
            SampleData::U8(v) => v.fill(128),
            other => other.as_bytes_mut().fill(0),
        }
    }

    /// Set every sample to `value`. Integer formats are left unchanged.
    pub fn fill(&mut self, value: f32) {
        match &mut self.data {
            SampleData::F32(v) => v.fill(value),
            SampleData::F64(v) => v.fill(value as f64),
            _ => {}
        }
    }

    /// Copy `other`'s bytes over this buffer's, up to the shorter length.
    /// No-op unless both specs match exactly.
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        if self.spec != other.spec {
            return;
        }
        let src = other.as_bytes();
        let dst = self.as_bytes_mut();
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
    }

    /// Per-sample `dst += src * gain` over the overlapping frames, saturating
    /// integer formats. No-op unless both specs match exactly.
    pub fn mix_from(&mut self, other: &AudioBuffer, gain: f32) {
        if self.spec != other.spec {
            return;
        }
        let n = self.data.len().min(other.data.len());
        match (&mut self.data, &other.data) {
            (SampleData::F32(dst), SampleData::F32(src)) => {
                for (d, s) in dst[..n].iter_mut().zip(&src[..n]) {
                    *d += *s * gain;
                }
            }
            (SampleData::F64(dst), SampleData::F64(src)) => {
                let g = gain as f64;
                for (d, s) in dst[..n].iter_mut().zip(&src[..n]) {
                    *d += *s * g;
                }
            }
            (dst, src) => {
                let g = gain as f64;
                for i in 0..n {
                    let v = dst.get(i) + src.get(i) * g;
                    dst.set(i, v);
                }
            }
        }
    }

    /// Multiply every sample by `gain`, saturating integer formats.
    pub fn apply_gain(&mut self, gain: f32) {
        match &mut self.data {
            SampleData::F32(v) => {
                for s in v.iter_mut() {
                    *s *= gain;
                }
            }
            SampleData::F64(v) => {
                let g = gain as f64;
                for s in v.iter_mut() {
                    *s *= g;
                }
            }
            other => {
                let g = gain as f64;
                for i in 0..other.len() {
                    let v = other.get(i) * g;
                    other.set(i, v);
                }
            }
        }
    }

    /// Linear 0→1 ramp over the first `min(frames, frame_count)` frames.
    /// The first frame is silent and the last ramp frame is at full level.
    pub fn apply_fade_in(&mut self, frames: usize) {
        let n = frames.min(self.frames);
        for i in 0..n {
            let gain = ramp_position(i, n);
            self.scale_frame(i, gain);
        }
    }

    /// Linear 1→0 ramp over the last `min(frames, frame_count)` frames.
    /// The final frame is silent.
    pub fn apply_fade_out(&mut self, frames: usize) {
        let n = frames.min(self.frames);
        let start = self.frames - n;
        for j in 0..n {
            let gain = ramp_position(n - 1 - j, n);
            self.scale_frame(start + j, gain);
        }
    }

    fn scale_frame(&mut self, frame: usize, gain: f64) {
        let channels = self.channels();
        let base = frame * channels;
        match &mut self.data {
            SampleData::F32(v) => {
                for s in &mut v[base..base + channels] {
                    *s = (*s as f64 * gain) as f32;
                }
            }
            other => {
                for i in base..base + channels {
                    let v = other.get(i) * gain;
                    other.set(i, v);
                }
            }
        }
    }

    /// Resample to `new_rate` with linear interpolation, producing
    /// `round(frames * new_rate / old_rate)` frames. Float formats only;
    /// integer buffers must be converted first and are left unchanged.
    pub fn resample(&mut self, new_rate: u32) {
        let old_rate = self.spec.sample_rate;
        if new_rate == 0 || old_rate == 0 || new_rate == old_rate || !self.spec.format.is_float() {
            return;
        }
        let channels = self.channels();
        let new_frames =
            libm::round(self.frames as f64 * new_rate as f64 / old_rate as f64) as usize;
        let step = old_rate as f64 / new_rate as f64;
        let mut out = SampleData::silent(self.spec.format, new_frames * channels);

        if self.frames > 0 {
            let last = self.frames - 1;
            for i in 0..new_frames {
                let pos = i as f64 * step;
                let idx = (libm::floor(pos) as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = pos - idx as f64;
                for ch in 0..channels {
                    let a = self.data.get(idx * channels + ch);
                    let b = self.data.get(next * channels + ch);
                    out.set(i * channels + ch, a + (b - a) * frac);
                }
            }
        }

        self.data = out;
        self.frames = new_frames;
        self.spec.sample_rate = new_rate;
    }

    /// Transcode into `new_format` through a normalised intermediate.
    ///
    /// PCM16→F32 divides by 32768 exactly; F32→PCM16 multiplies by 32768,
    /// rounds and clips.
    pub fn convert_format(&mut self, new_format: SampleFormat) {
        if new_format == self.spec.format {
            return;
        }
        let len = self.data.len();
        let mut out = SampleData::silent(new_format, len);
        for i in 0..len {
            out.set(i, self.data.get(i));
        }
        self.data = out;
        self.spec.format = new_format;
    }

    /// Remap to `new_layout`: channels are copied by index, missing
    /// destination channels are silent and excess source channels dropped.
    pub fn convert_channels(&mut self, new_layout: ChannelLayout) {
        if new_layout == self.spec.layout {
            return;
        }
        let old_ch = self.channels();
        let new_ch = new_layout.channel_count();
        let bps = self.spec.bytes_per_sample();
        let shared = old_ch.min(new_ch);

        let mut out = SampleData::silent(self.spec.format, self.frames * new_ch);
        {
            let src = self.data.as_bytes();
            let dst = out.as_bytes_mut();
            for f in 0..self.frames {
                let s = f * old_ch * bps;
                let d = f * new_ch * bps;
                let n = shared * bps;
                dst[d..d + n].copy_from_slice(&src[s..s + n]);
            }
        }
        self.data = out;
        self.spec.layout = new_layout;
    }

    /// Copy of frames `[start, start + count)`, clipped to the buffer.
    pub fn extract_frames(&self, start: usize, count: usize) -> AudioBuffer {
        let start = start.min(self.frames);
        let count = count.min(self.frames - start);
        let bpf = self.spec.bytes_per_frame();
        let mut out = AudioBuffer::new(self.spec, count);
        out.as_bytes_mut()
            .copy_from_slice(&self.as_bytes()[start * bpf..(start + count) * bpf]);
        out
    }

    /// Overwrite frames starting at `dst_start` with the whole of `src`,
    /// clipped to this buffer. Returns the number of frames written; 0 if the
    /// specs differ.
    pub fn write_frames(&mut self, dst_start: usize, src: &AudioBuffer) -> usize {
        if self.spec != src.spec || dst_start >= self.frames {
            return 0;
        }
        let count = src.frames.min(self.frames - dst_start);
        let bpf = self.spec.bytes_per_frame();
        self.as_bytes_mut()[dst_start * bpf..(dst_start + count) * bpf]
            .copy_from_slice(&src.as_bytes()[..count * bpf]);
        count
    }
}

/// Position `i` on a linear ramp of `n` frames, 0 at the first frame and 1
/// at the last.
fn ramp_position(i: usize, n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else {
        i as f64 / (n - 1) as f64
    }
}
