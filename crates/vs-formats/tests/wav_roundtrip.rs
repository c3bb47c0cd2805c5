use std::io::Cursor;

use vs_core::{AudioBuffer, AudioSpec, ChannelLayout, SampleData, SampleFormat};
use vs_formats::{buffer_to_wav, load_wav, load_wav_file, save_wav, FormatError};

fn tone(format: SampleFormat, layout: ChannelLayout) -> AudioBuffer {
    let spec = AudioSpec::new(8000, format, layout);
    let mut buf = AudioBuffer::new(spec, 64);
    for f in 0..buf.frames() {
        for ch in 0..buf.channels() {
            let v = ((f * 7 + ch * 3) % 17) as f32 / 17.0 - 0.5;
            buf.set_sample(f, ch, v);
        }
    }
    buf
}

#[test]
fn pcm16_stereo_is_bit_exact() {
    let buf = tone(SampleFormat::I16, ChannelLayout::Stereo);
    let loaded = load_wav(&buffer_to_wav(&buf).unwrap()).unwrap();
    assert_eq!(loaded, buf);
}

#[test]
fn pcm24_keeps_packed_samples() {
    let buf = tone(SampleFormat::I24, ChannelLayout::Mono);
    let loaded = load_wav(&buffer_to_wav(&buf).unwrap()).unwrap();
    assert_eq!(loaded.spec().format, SampleFormat::I24);
    assert_eq!(loaded, buf);
}

#[test]
fn unsigned_eight_bit_keeps_offset() {
    let spec = AudioSpec::new(8000, SampleFormat::U8, ChannelLayout::Mono);
    let buf = AudioBuffer::from_data(spec, SampleData::U8(vec![0, 64, 128, 200, 255])).unwrap();
    let loaded = load_wav(&buffer_to_wav(&buf).unwrap()).unwrap();
    assert_eq!(loaded, buf);
}

#[test]
fn f64_is_written_as_f32() {
    let buf = tone(SampleFormat::F64, ChannelLayout::Stereo);
    let loaded = load_wav(&buffer_to_wav(&buf).unwrap()).unwrap();
    assert_eq!(loaded.spec().format, SampleFormat::F32);
    assert_eq!(loaded.frames(), buf.frames());
    assert!((loaded.sample(3, 1) - buf.sample(3, 1)).abs() < 1e-7);
}

#[test]
fn three_channels_are_rejected() {
    let spec = hound::WavSpec {
        channels: 3,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..6 {
            w.write_sample(0i16).unwrap();
        }
        w.finalize().unwrap();
    }
    let err = load_wav(cursor.get_ref()).unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedChannels(3)));
}

#[test]
fn file_round_trip() {
    let path = std::env::temp_dir().join(format!("vs-formats-{}.wav", std::process::id()));
    let buf = tone(SampleFormat::I16, ChannelLayout::Mono);
    save_wav(&path, &buf).unwrap();
    let loaded = load_wav_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded, buf);
}
