//! WAV encoding and decoding through `hound`.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat as WavFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use vs_core::{i24_to_i32, i32_to_i24, AudioBuffer, AudioSpec, ChannelLayout, SampleData, SampleFormat};

use crate::FormatError;

// --- Reading ---

/// Decode a WAV image into a buffer of the file's own format.
pub fn load_wav(data: &[u8]) -> Result<AudioBuffer, FormatError> {
    read_wav(WavReader::new(Cursor::new(data))?)
}

pub fn load_wav_file(path: impl AsRef<Path>) -> Result<AudioBuffer, FormatError> {
    let path = path.as_ref();
    let buffer = read_wav(WavReader::open(path)?)?;
    debug!(
        "loaded {}: {} frames, {:?}",
        path.display(),
        buffer.frames(),
        buffer.spec()
    );
    Ok(buffer)
}

fn read_wav<R: Read>(mut reader: WavReader<R>) -> Result<AudioBuffer, FormatError> {
    let wav = reader.spec();
    let layout = ChannelLayout::from_channel_count(wav.channels as usize)
        .ok_or(FormatError::UnsupportedChannels(wav.channels))?;

    let data = match (wav.sample_format, wav.bits_per_sample) {
        // hound hands out 8-bit PCM as signed; store it offset-128 unsigned.
        (WavFormat::Int, 8) => SampleData::U8(
            reader
                .samples::<i8>()
                .map(|s| s.map(|v| (v as i16 + 128) as u8))
                .collect::<Result<_, _>>()?,
        ),
        (WavFormat::Int, 16) => SampleData::I16(reader.samples::<i16>().collect::<Result<_, _>>()?),
        (WavFormat::Int, 24) => SampleData::I24(
            reader
                .samples::<i32>()
                .map(|s| s.map(i32_to_i24))
                .collect::<Result<_, _>>()?,
        ),
        (WavFormat::Int, 32) => SampleData::I32(reader.samples::<i32>().collect::<Result<_, _>>()?),
        (WavFormat::Float, 32) => SampleData::F32(reader.samples::<f32>().collect::<Result<_, _>>()?),
        (WavFormat::Int, bits) => return Err(FormatError::UnsupportedFormat { bits, kind: "integer" }),
        (WavFormat::Float, bits) => return Err(FormatError::UnsupportedFormat { bits, kind: "float" }),
    };

    let spec = AudioSpec::new(wav.sample_rate, data.format(), layout);
    let channels = layout.channel_count();
    let data = truncate_to_frames(data, channels);
    AudioBuffer::from_data(spec, data).ok_or(FormatError::UnsupportedChannels(wav.channels))
}

fn truncate_to_frames(mut data: SampleData, channels: usize) -> SampleData {
    let keep = data.len() / channels * channels;
    match &mut data {
        SampleData::U8(v) => v.truncate(keep),
        SampleData::I16(v) => v.truncate(keep),
        SampleData::I24(v) => v.truncate(keep),
        SampleData::I32(v) => v.truncate(keep),
        SampleData::F32(v) => v.truncate(keep),
        SampleData::F64(v) => v.truncate(keep),
    }
    data
}

// --- Writing ---

fn wav_spec(spec: &AudioSpec) -> WavSpec {
    let (bits_per_sample, sample_format) = match spec.format {
        SampleFormat::U8 => (8, WavFormat::Int),
        SampleFormat::I16 => (16, WavFormat::Int),
        SampleFormat::I24 => (24, WavFormat::Int),
        SampleFormat::I32 => (32, WavFormat::Int),
        // WAV has no 64-bit float in hound; f64 buffers are written as f32.
        SampleFormat::F32 | SampleFormat::F64 => (32, WavFormat::Float),
    };
    WavSpec {
        channels: spec.channels() as u16,
        sample_rate: spec.sample_rate,
        bits_per_sample,
        sample_format,
    }
}

/// Encode `buffer` as WAV in its own sample format (f64 as f32).
pub fn write_wav<W: Write + Seek>(w: W, buffer: &AudioBuffer) -> Result<(), FormatError> {
    let mut writer = WavWriter::new(w, wav_spec(buffer.spec()))?;
    match buffer.data() {
        SampleData::U8(v) => {
            for &s in v {
                writer.write_sample((s as i16 - 128) as i8)?;
            }
        }
        SampleData::I16(v) => {
            for &s in v {
                writer.write_sample(s)?;
            }
        }
        SampleData::I24(v) => {
            for &s in v {
                writer.write_sample(i24_to_i32(s))?;
            }
        }
        SampleData::I32(v) => {
            for &s in v {
                writer.write_sample(s)?;
            }
        }
        SampleData::F32(v) => {
            for &s in v {
                writer.write_sample(s)?;
            }
        }
        SampleData::F64(v) => {
            for &s in v {
                writer.write_sample(s as f32)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Encode `buffer` into an in-memory WAV image.
pub fn buffer_to_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, FormatError> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, buffer)?;
    Ok(cursor.into_inner())
}

pub fn save_wav(path: impl AsRef<Path>, buffer: &AudioBuffer) -> Result<(), FormatError> {
    let path = path.as_ref();
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_wav(file, buffer)?;
    debug!("wrote {} ({} frames)", path.display(), buffer.frames());
    Ok(())
}
