//! PCM 格式与周期参数

use crate::SoundError;

/// PCM 采样格式（小端）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 8 位无符号（WAV 中 8 位采样为无符号）
    U8,
    S16LE,
    /// 24 位有符号，每个采样 3 字节
    S24_3LE,
    S32LE,
}

impl SampleFormat {
    /// 从采样宽度（字节）映射
    ///
    /// # 错误
    /// - `SoundError::UnsupportedSampleWidth`: 宽度不是 1..=4（致命）
    pub fn from_width(width: u16) -> Result<Self, SoundError> {
        match width {
            1 => Ok(SampleFormat::U8),
            2 => Ok(SampleFormat::S16LE),
            3 => Ok(SampleFormat::S24_3LE),
            4 => Ok(SampleFormat::S32LE),
            other => Err(SoundError::UnsupportedSampleWidth(other)),
        }
    }

    /// 每个采样的字节数
    pub const fn width(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16LE => 2,
            SampleFormat::S24_3LE => 3,
            SampleFormat::S32LE => 4,
        }
    }

    /// 把整数采样编码为小端字节追加到 `out`
    ///
    /// `sample` 的取值范围为该宽度的有符号范围；U8 加 128 偏移转为无符号。
    pub fn encode(self, sample: i32, out: &mut Vec<u8>) {
        match self {
            SampleFormat::U8 => out.push((sample + 128) as u8),
            SampleFormat::S16LE => out.extend_from_slice(&(sample as i16).to_le_bytes()),
            SampleFormat::S24_3LE => out.extend_from_slice(&sample.to_le_bytes()[..3]),
            SampleFormat::S32LE => out.extend_from_slice(&sample.to_le_bytes()),
        }
    }
}

/// 音源格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundFormat {
    pub channels: u16,
    pub rate: u32,
    /// 采样宽度（字节）
    pub width: u16,
}

/// PCM 设备配置参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmParams {
    pub channels: u16,
    pub rate: u32,
    pub format: SampleFormat,
    /// 每周期帧数
    pub period_frames: usize,
}

impl PcmParams {
    /// 播放参数：周期 = 1/10 秒
    ///
    /// # 错误
    /// - `SoundError::UnsupportedSampleWidth`: 宽度无法映射（致命）
    /// - `SoundError::UnsupportedFormat`: 无声道，或采样率低于 10 Hz（周期为 0 帧）
    pub fn for_playback(format: SoundFormat) -> Result<Self, SoundError> {
        if format.channels == 0 {
            return Err(SoundError::UnsupportedFormat("no channels".into()));
        }
        if format.rate < 10 {
            return Err(SoundError::UnsupportedFormat(format!(
                "sample rate {} Hz too low",
                format.rate
            )));
        }
        Ok(Self {
            channels: format.channels,
            rate: format.rate,
            format: SampleFormat::from_width(format.width)?,
            period_frames: (format.rate / 10) as usize,
        })
    }

    /// 录音参数：单声道、16 kHz、S16LE、1600 帧周期
    pub const fn capture() -> Self {
        Self {
            channels: 1,
            rate: crate::RECORD_RATE,
            format: SampleFormat::S16LE,
            period_frames: crate::RECORD_PERIOD_FRAMES,
        }
    }

    /// 每帧字节数
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.format.width()
    }

    /// 每周期字节数（`period_frames * channels * width`）
    pub fn period_bytes(&self) -> usize {
        self.period_frames * self.frame_bytes()
    }
}
