//! Buffer and editor invariants over a handful of formats and lengths.

use vs_core::{AudioBuffer, AudioSpec, ChannelLayout, SampleData, SampleFormat};
use vs_edit::WaveformEditor;

const FORMATS: [SampleFormat; 6] = [
    SampleFormat::U8,
    SampleFormat::I16,
    SampleFormat::I24,
    SampleFormat::I32,
    SampleFormat::F32,
    SampleFormat::F64,
];

/// A buffer filled with a deterministic, non-repeating pattern.
fn pattern(spec: AudioSpec, frames: usize) -> AudioBuffer {
    let mut buf = AudioBuffer::new(spec, frames);
    let channels = spec.channels();
    for f in 0..frames {
        for ch in 0..channels {
            let v = ((f * 37 + ch * 11) % 199) as f32 / 100.0 - 0.99;
            buf.set_sample(f, ch, v);
        }
    }
    buf
}

fn stereo_f32(rate: u32, frames: usize) -> AudioBuffer {
    pattern(AudioSpec::float(rate, ChannelLayout::Stereo), frames)
}

#[test]
fn size_is_frames_times_frame_bytes() {
    for format in FORMATS {
        for layout in [ChannelLayout::Mono, ChannelLayout::Stereo, ChannelLayout::Surround51] {
            let spec = AudioSpec::new(22050, format, layout);
            for frames in [0, 1, 257] {
                let buf = AudioBuffer::new(spec, frames);
                assert_eq!(buf.size_in_bytes(), frames * spec.bytes_per_frame(), "{format:?} {layout:?}");
            }
        }
    }
}

#[test]
fn clone_is_identical_and_independent() {
    for format in FORMATS {
        let original = pattern(AudioSpec::new(8000, format, ChannelLayout::Stereo), 64);
        let mut copy = original.clone();
        assert_eq!(copy.as_bytes(), original.as_bytes());
        assert_ne!(copy.as_bytes().as_ptr(), original.as_bytes().as_ptr());

        let before = original.sample(3, 1);
        copy.set_sample(3, 1, 0.5);
        assert_eq!(original.sample(3, 1), before);
    }
}

#[test]
fn gain_and_inverse_gain_restore_floats() {
    let original = stereo_f32(8000, 500);
    for g in [2.0f32, 0.25, 8.0, -1.0, -0.5] {
        let mut buf = original.clone();
        buf.apply_gain(g);
        buf.apply_gain(1.0 / g);
        for (a, b) in buf.as_f32().unwrap().iter().zip(original.as_f32().unwrap()) {
            let ulp = (a.to_bits() as i64 - b.to_bits() as i64).abs();
            assert!(ulp <= 1, "gain {g}: {a} vs {b}");
        }
    }
}

#[test]
fn fade_in_then_out_shape() {
    for n in [3usize, 101, 4411] {
        let mut buf = AudioBuffer::from_interleaved_f32(44100, ChannelLayout::Mono, vec![1.0; n]);
        buf.apply_fade_in(n);
        buf.apply_fade_out(n);
        let s = buf.as_f32().unwrap();
        assert_eq!(s[0], 0.0);
        assert_eq!(s[n - 1], 0.0);
        assert!(s[n / 2] >= 0.25, "n {n}: {}", s[n / 2]);
    }
}

#[test]
fn resample_frame_count() {
    for (frames, from, to) in [(1000, 44100, 48000), (441, 44100, 22050), (7, 8000, 44100), (0, 8000, 16000)] {
        let mut buf = stereo_f32(from, frames);
        buf.resample(to);
        let expected = (frames as f64 * to as f64 / from as f64).round() as i64;
        assert!((buf.frames() as i64 - expected).abs() <= 1);
        assert_eq!(buf.sample_rate(), to);
    }
}

#[test]
fn insert_silence_preserves_prefix_and_suffix() {
    for format in [SampleFormat::I16, SampleFormat::F32, SampleFormat::I24] {
        let original = pattern(AudioSpec::new(1000, format, ChannelLayout::Stereo), 1000);
        let mut editor = WaveformEditor::new(original.clone());
        assert!(editor.insert_silence(0.25, 0.1234));

        let buf = editor.buffer();
        assert_eq!(buf.frames(), 1000 + 123);
        let bpf = buf.spec().bytes_per_frame();
        let (src, dst) = (original.as_bytes(), buf.as_bytes());
        assert_eq!(&dst[..250 * bpf], &src[..250 * bpf]);
        for f in 250..373 {
            assert_eq!(buf.sample(f, 0), 0.0);
            assert_eq!(buf.sample(f, 1), 0.0);
        }
        assert_eq!(&dst[373 * bpf..], &src[250 * bpf..]);
    }
}

#[test]
fn reverse_twice_is_identity() {
    for format in FORMATS {
        let original = pattern(AudioSpec::new(1000, format, ChannelLayout::Stereo), 777);
        let mut editor = WaveformEditor::new(original.clone());
        let d = editor.duration();
        assert!(editor.reverse(0.0, d));
        assert_ne!(editor.buffer(), &original);
        assert!(editor.reverse(0.0, d));
        assert_eq!(editor.buffer(), &original);
    }
}

#[test]
fn invert_twice_is_identity() {
    for format in FORMATS {
        let original = pattern(AudioSpec::new(1000, format, ChannelLayout::Stereo), 300);
        let mut editor = WaveformEditor::new(original.clone());
        let d = editor.duration();
        assert!(editor.invert(0.0, d));
        let lsb = match format {
            SampleFormat::F32 | SampleFormat::F64 => 0.0,
            _ => 1.0 / 2f64.powi(format.bytes_per_sample() as i32 * 8 - 1),
        };
        let (a, b) = (editor.buffer().sample_f64(1, 0), original.sample_f64(1, 0));
        assert!((a + b).abs() <= lsb, "{format:?}: {a} vs {b}");
        assert!(editor.invert(0.0, d));
        assert_eq!(editor.buffer(), &original, "{format:?}");
    }
}

#[test]
fn invert_keeps_integer_extremes() {
    let data = SampleData::I32(vec![123_456_789, -987_654_321, 1, 7]);
    let spec = AudioSpec::new(1000, SampleFormat::I32, ChannelLayout::Mono);
    let original = AudioBuffer::from_data(spec, data).unwrap();
    let mut editor = WaveformEditor::new(original.clone());
    assert!(editor.invert(0.0, 1.0));
    assert!(editor.invert(0.0, 1.0));
    assert_eq!(editor.buffer(), &original);

    let spec = AudioSpec::new(1000, SampleFormat::I16, ChannelLayout::Mono);
    let original = AudioBuffer::from_data(spec, SampleData::I16(vec![i16::MIN, 5, i16::MAX])).unwrap();
    let mut editor = WaveformEditor::new(original.clone());
    assert!(editor.invert(0.0, 1.0));
    assert_eq!(editor.buffer().data(), &SampleData::I16(vec![i16::MAX, -6, i16::MIN]));
    assert!(editor.invert(0.0, 1.0));
    assert_eq!(editor.buffer(), &original);
}

#[test]
fn unity_fade_and_silent_mix_keep_i32_bits() {
    let spec = AudioSpec::new(1000, SampleFormat::I32, ChannelLayout::Mono);
    let data = SampleData::I32(vec![123_456_789, -987_654_321, 1, 7]);
    let original = AudioBuffer::from_data(spec, data).unwrap();
    let mut editor = WaveformEditor::new(original.clone());
    assert!(editor.fade(0.0, 1.0, 1.0, 1.0));
    assert_eq!(editor.buffer(), &original);

    let silence = AudioBuffer::new(spec, 4);
    assert!(editor.mix(&silence, 0.0, 1.0));
    assert_eq!(editor.buffer(), &original);
}

#[test]
fn every_edit_undoes_to_the_original() {
    let original = stereo_f32(1000, 1000);
    let edits: [fn(&mut WaveformEditor) -> bool; 8] = [
        |e| e.delete_range(0.1, 0.2),
        |e| e.crop(0.2, 0.7),
        |e| e.normalize(0.5),
        |e| e.fade_out(0.5, 1.0),
        |e| e.silence(0.0, 0.3),
        |e| e.generate_tone(0.1, 0.2, 100.0, 0.5),
        |e| e.generate_noise(0.4, 0.1, 0.3),
        |e| e.sample_rate_conversion(2000),
    ];
    for (i, edit) in edits.iter().enumerate() {
        let mut editor = WaveformEditor::new(original.clone());
        assert!(edit(&mut editor), "edit {i}");
        let edited = editor.buffer().clone();
        assert_ne!(edited, original, "edit {i}");
        assert!(editor.undo());
        assert_eq!(editor.buffer(), &original, "undo {i}");
        assert!(editor.redo());
        assert_eq!(editor.buffer(), &edited, "redo {i}");
    }
}
