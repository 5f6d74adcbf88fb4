//! 音源：把 WAV / MP3 文件解码为交错的小端 PCM 字节流
//!
//! - WAV（hound）：保留文件的采样宽度（8/16/24/32 位整数）
//! - MP3（symphonia）：输出 16 位有符号

use crate::SoundError;
use crate::format::{SampleFormat, SoundFormat};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// 解码后的 PCM 音源
pub trait SoundSource: Send {
    fn format(&self) -> SoundFormat;

    /// 下一块交错 PCM 数据（长度任意，按帧对齐）；结束返回 `None`
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SoundError>;
}

/// 按扩展名打开音源
///
/// # 错误
/// - `SoundError::UnsupportedFile`: 扩展名不是 `.wav` / `.mp3`
pub fn open_source(path: &Path) -> Result<Box<dyn SoundSource>, SoundError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("wav") => Ok(Box::new(WavSource::open(path)?)),
        Some("mp3") => Ok(Box::new(Mp3Source::open(path)?)),
        _ => Err(SoundError::UnsupportedFile(path.display().to_string())),
    }
}

/// WAV 音源
pub struct WavSource {
    reader: hound::WavReader<BufReader<File>>,
    format: SoundFormat,
    sample_format: SampleFormat,
    chunk_samples: usize,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self, SoundError> {
        let reader = hound::WavReader::open(path).map_err(|e| SoundError::io(path.display(), e))?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(SoundError::UnsupportedFormat(format!(
                "{}: floating point WAV",
                path.display()
            )));
        }
        let width = spec.bits_per_sample.div_ceil(8);
        let sample_format = SampleFormat::from_width(width)?;
        let format = SoundFormat {
            channels: spec.channels,
            rate: spec.sample_rate,
            width,
        };
        debug!("WAV {}: {:?}", path.display(), format);
        Ok(Self {
            reader,
            format,
            sample_format,
            // 每块 1/10 秒
            chunk_samples: (spec.sample_rate as usize / 10).max(1) * spec.channels as usize,
        })
    }
}

impl SoundSource for WavSource {
    fn format(&self) -> SoundFormat {
        self.format
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SoundError> {
        let mut out = Vec::with_capacity(self.chunk_samples * self.sample_format.width());
        for sample in self.reader.samples::<i32>().take(self.chunk_samples) {
            let sample = sample.map_err(|e| SoundError::Decode(e.to_string()))?;
            self.sample_format.encode(sample, &mut out);
        }
        Ok(if out.is_empty() { None } else { Some(out) })
    }
}

/// MP3 音源
pub struct Mp3Source {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: SoundFormat,
    sample_buf: Option<SampleBuffer<i16>>,
}

impl Mp3Source {
    pub fn open(path: &Path) -> Result<Self, SoundError> {
        let file = File::open(path).map_err(|e| SoundError::io(path.display(), e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("mp3");

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| SoundError::Decode(format!("{}: {}", path.display(), e)))?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SoundError::Decode(format!("{}: no audio track", path.display())))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let rate = codec_params
            .sample_rate
            .ok_or_else(|| SoundError::Decode("sample rate not found".into()))?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| SoundError::Decode("channel count not found".into()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| SoundError::UnsupportedFormat(e.to_string()))?;

        let format = SoundFormat {
            channels,
            rate,
            width: 2,
        };
        debug!("MP3 {}: {:?}", path.display(), format);
        Ok(Self {
            format_reader,
            decoder,
            track_id,
            format,
            sample_buf: None,
        })
    }
}

impl SoundSource for Mp3Source {
    fn format(&self) -> SoundFormat {
        self.format
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SoundError> {
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                },
                Err(e) => return Err(SoundError::Decode(e.to_string())),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt MP3 frame: {}", e);
                    continue;
                },
                Err(e) => return Err(SoundError::Decode(e.to_string())),
            };
            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let capacity = decoded.capacity();
            if self
                .sample_buf
                .as_ref()
                .is_none_or(|buf| buf.capacity() < capacity * spec.channels.count())
            {
                self.sample_buf = Some(SampleBuffer::new(capacity as u64, spec));
            }
            let Some(buf) = self.sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            let mut out = Vec::with_capacity(buf.samples().len() * 2);
            for sample in buf.samples() {
                out.extend_from_slice(&sample.to_le_bytes());
            }
            return Ok(Some(out));
        }
    }
}
