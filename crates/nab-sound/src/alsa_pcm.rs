//! ALSA PCM 后端
//!
//! 设备以阻塞模式打开，交错读写（RW_INTERLEAVED）。写入时遇到 underrun
//! 等可恢复错误先 `try_recover` 再重试一次。

use crate::backend::{PcmBackend, PcmReader, PcmWriter};
use crate::format::{PcmParams, SampleFormat};
use crate::SoundError;
use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use tracing::{debug, warn};

impl SampleFormat {
    fn alsa_format(self) -> Format {
        match self {
            SampleFormat::U8 => Format::U8,
            SampleFormat::S16LE => Format::S16LE,
            SampleFormat::S24_3LE => Format::S243LE,
            SampleFormat::S32LE => Format::S32LE,
        }
    }
}

/// ALSA 后端
#[derive(Debug, Default, Clone, Copy)]
pub struct AlsaBackend;

impl AlsaBackend {
    pub fn new() -> Self {
        Self
    }

    fn open(device: &str, direction: Direction, params: &PcmParams) -> Result<PCM, SoundError> {
        let err = |e: alsa::Error| SoundError::device(device, e);

        let pcm = PCM::new(device, direction, false).map_err(err)?;
        {
            let hwp = HwParams::any(&pcm).map_err(err)?;
            hwp.set_access(Access::RWInterleaved).map_err(err)?;
            hwp.set_format(params.format.alsa_format()).map_err(err)?;
            hwp.set_channels(params.channels as u32).map_err(err)?;
            hwp.set_rate(params.rate, ValueOr::Nearest).map_err(err)?;
            hwp.set_period_size_near(params.period_frames as alsa::pcm::Frames, ValueOr::Nearest)
                .map_err(err)?;
            pcm.hw_params(&hwp).map_err(err)?;
        }

        // plughw 会做重采样；直接 hw 设备可能退而选最近的采样率
        let current = pcm.hw_params_current().map_err(err)?;
        let rate = current.get_rate().map_err(err)?;
        let channels = current.get_channels().map_err(err)?;
        if rate != params.rate || channels != params.channels as u32 {
            return Err(SoundError::device(
                device,
                format!(
                    "requested {} Hz x{}, device accepted {} Hz x{}",
                    params.rate, params.channels, rate, channels
                ),
            ));
        }

        debug!(
            "Opened {} ({:?}, {} Hz, {} ch, period {} frames)",
            device,
            params.format,
            params.rate,
            params.channels,
            current.get_period_size().unwrap_or(0)
        );
        Ok(pcm)
    }
}

impl PcmBackend for AlsaBackend {
    fn open_playback(
        &self,
        device: &str,
        params: &PcmParams,
    ) -> Result<Box<dyn PcmWriter>, SoundError> {
        let pcm = Self::open(device, Direction::Playback, params)?;
        Ok(Box::new(AlsaWriter {
            pcm,
            device: device.to_string(),
            frame_bytes: params.frame_bytes(),
        }))
    }

    fn open_capture(
        &self,
        device: &str,
        params: &PcmParams,
    ) -> Result<Box<dyn PcmReader>, SoundError> {
        let pcm = Self::open(device, Direction::Capture, params)?;
        Ok(Box::new(AlsaReader {
            pcm,
            device: device.to_string(),
            frame_bytes: params.frame_bytes(),
        }))
    }

    fn card_names(&self) -> Result<Vec<String>, SoundError> {
        let mut names = Vec::new();
        for card in alsa::card::Iter::new() {
            let card = card.map_err(|e| SoundError::device("card list", e))?;
            let ctl = alsa::Ctl::from_card(&card, false)
                .map_err(|e| SoundError::device("card list", e))?;
            let info = ctl
                .card_info()
                .map_err(|e| SoundError::device("card list", e))?;
            let id = info
                .get_id()
                .map_err(|e| SoundError::device("card list", e))?;
            names.push(id.to_string());
        }
        Ok(names)
    }
}

struct AlsaWriter {
    pcm: PCM,
    device: String,
    frame_bytes: usize,
}

impl AlsaWriter {
    fn write_frames(&self, data: &[u8]) -> Result<usize, alsa::Error> {
        self.pcm.io_bytes().writei(data)
    }
}

impl PcmWriter for AlsaWriter {
    fn write(&mut self, period: &[u8]) -> Result<(), SoundError> {
        let mut offset = 0;
        while offset < period.len() {
            let written = match self.write_frames(&period[offset..]) {
                Ok(frames) => frames,
                Err(e) => {
                    warn!("PCM write on {} failed: {}, recovering", self.device, e);
                    self.pcm
                        .try_recover(e, true)
                        .map_err(|e| SoundError::device(&self.device, e))?;
                    self.write_frames(&period[offset..])
                        .map_err(|e| SoundError::device(&self.device, e))?
                },
            };
            offset += written * self.frame_bytes;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SoundError> {
        self.pcm
            .drain()
            .map_err(|e| SoundError::device(&self.device, e))
    }
}

struct AlsaReader {
    pcm: PCM,
    device: String,
    frame_bytes: usize,
}

impl PcmReader for AlsaReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SoundError> {
        let frames = match self.pcm.io_bytes().readi(buf) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("PCM read on {} failed: {}, recovering", self.device, e);
                self.pcm
                    .try_recover(e, true)
                    .map_err(|e| SoundError::device(&self.device, e))?;
                self.pcm
                    .io_bytes()
                    .readi(buf)
                    .map_err(|e| SoundError::device(&self.device, e))?
            },
        };
        Ok(frames * self.frame_bytes)
    }
}
