//! 播放管线：把解码后的 PCM 切分为固定周期写入设备
//!
//! - 周期 = rate/10 帧，每次写入恰好 `period_frames * channels * width` 字节
//! - 自然结束：最后不足一个周期的数据补零后写入，然后排空设备
//! - 提前停止：每次写入前检查运行标志，标志清除后丢弃未写入的部分

use crate::SoundError;
use crate::backend::PcmBackend;
use crate::format::PcmParams;
use crate::source::SoundSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// 固定周期切分器
#[derive(Debug)]
pub struct PeriodChunker {
    period_bytes: usize,
    pending: Vec<u8>,
}

impl PeriodChunker {
    pub fn new(period_bytes: usize) -> Self {
        Self {
            period_bytes,
            pending: Vec::with_capacity(period_bytes * 2),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// 取出一个完整周期（不足时返回 `None`）
    pub fn pop_period(&mut self) -> Option<Vec<u8>> {
        if self.pending.len() < self.period_bytes {
            return None;
        }
        let rest = self.pending.split_off(self.period_bytes);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// 取出剩余数据并补零到一个周期；没有剩余数据时返回 `None`
    pub fn finish(&mut self) -> Option<(Vec<u8>, usize)> {
        if self.pending.is_empty() {
            return None;
        }
        let mut last = std::mem::take(&mut self.pending);
        let padding = self.period_bytes - last.len();
        last.resize(self.period_bytes, 0);
        Some((last, padding))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// 播放结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackReport {
    /// 写入的周期数（含补零周期）
    pub periods: usize,
    /// 最后一个周期补零的字节数
    pub padding: usize,
    /// 是否因运行标志清除而提前结束
    pub stopped: bool,
}

/// 播放管线
#[derive(Clone)]
pub struct PlaybackPipeline {
    backend: Arc<dyn PcmBackend>,
    device: String,
}

impl PlaybackPipeline {
    pub fn new(backend: Arc<dyn PcmBackend>, device: impl Into<String>) -> Self {
        Self {
            backend,
            device: device.into(),
        }
    }

    /// 播放整个音源（阻塞，在音频线程上调用）
    ///
    /// # 错误
    /// - `SoundError::UnsupportedSampleWidth`: 音源宽度无法映射到设备格式（致命）
    /// - 设备 / 解码错误：会话结束，设备在返回前关闭
    pub fn run(
        &self,
        mut source: Box<dyn SoundSource>,
        active: &AtomicBool,
    ) -> Result<PlaybackReport, SoundError> {
        let format = source.format();
        let params = PcmParams::for_playback(format)?;
        let mut writer = self.backend.open_playback(&self.device, &params)?;
        info!(
            "Playback on {}: {} Hz, {} ch, {:?}",
            self.device, params.rate, params.channels, params.format
        );

        let mut chunker = PeriodChunker::new(params.period_bytes());
        let mut report = PlaybackReport::default();

        'stream: while active.load(Ordering::Acquire) {
            let Some(data) = source.next_chunk()? else {
                break;
            };
            chunker.push(&data);
            while let Some(period) = chunker.pop_period() {
                if !active.load(Ordering::Acquire) {
                    break 'stream;
                }
                writer.write(&period)?;
                report.periods += 1;
            }
        }

        if !active.load(Ordering::Acquire) {
            report.stopped = true;
            debug!(
                "Playback stopped, {} pending bytes discarded",
                chunker.pending_len()
            );
            // writer 在这里 drop，未排空的数据被丢弃
            return Ok(report);
        }

        if let Some((last, padding)) = chunker.finish() {
            writer.write(&last)?;
            report.periods += 1;
            report.padding = padding;
        }
        writer.drain()?;
        debug!("Playback finished: {:?}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SoundFormat;
    use crate::mock::{MockPcmBackend, PcmEvent};
    use crate::source::{Mp3Source, WavSource};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// 无限音源：每块半个周期，第 `stop_after` 块之后清除运行标志
    struct EndlessSource {
        format: SoundFormat,
        chunk: usize,
        produced: usize,
        stop_after: usize,
        active: Arc<AtomicBool>,
    }

    impl SoundSource for EndlessSource {
        fn format(&self) -> SoundFormat {
            self.format
        }

        fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SoundError> {
            self.produced += 1;
            if self.produced == self.stop_after {
                self.active.store(false, Ordering::Release);
            }
            Ok(Some(vec![self.produced as u8; self.chunk]))
        }
    }

    fn wav_source(dir: &TempDir, frames: usize) -> Box<dyn SoundSource> {
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample(1000i16 + (i % 100) as i16).unwrap();
            writer.write_sample(-1000i16).unwrap();
        }
        writer.finalize().unwrap();
        Box::new(WavSource::open(&path).unwrap())
    }

    #[test]
    fn test_playback_writes_fixed_periods_and_pads_last() {
        let dir = TempDir::new().unwrap();
        let backend = MockPcmBackend::new();
        let pipeline = PlaybackPipeline::new(Arc::new(backend.clone()), "plughw:CARD=test");
        let active = AtomicBool::new(true);

        // 8000 Hz 立体声 16 位：周期 800 帧 = 3200 字节；2000 帧 = 2 个整周期 + 400 帧
        let report = pipeline.run(wav_source(&dir, 2000), &active).unwrap();
        assert_eq!(
            report,
            PlaybackReport {
                periods: 3,
                padding: 1600,
                stopped: false
            }
        );

        let writes = backend.writes();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|w| w.len() == 3200));
        assert!(writes[2][1600..].iter().all(|&b| b == 0));
        assert!(writes[2][..1600].iter().any(|&b| b != 0));

        let events = backend.events();
        assert!(matches!(
            &events[0],
            PcmEvent::OpenPlayback { device, params }
                if device == "plughw:CARD=test" && params.period_frames == 800 && params.channels == 2
        ));
        assert_eq!(events[events.len() - 2], PcmEvent::Drain);
        assert_eq!(events[events.len() - 1], PcmEvent::ClosePlayback);
    }

    #[test]
    fn test_playback_stop_discards_partial_period() {
        let backend = MockPcmBackend::new();
        let pipeline = PlaybackPipeline::new(Arc::new(backend.clone()), "default");
        let active = Arc::new(AtomicBool::new(true));
        let format = SoundFormat {
            channels: 1,
            rate: 16000,
            width: 2,
        };
        let source = EndlessSource {
            format,
            chunk: 1600,
            produced: 0,
            stop_after: 3,
            active: active.clone(),
        };

        let report = pipeline.run(Box::new(source), &active).unwrap();
        assert!(report.stopped);
        assert_eq!(report.periods, 1);

        // 只写入一个完整周期，不补零、不排空
        let events = backend.events();
        let mut expected = vec![1u8; 1600];
        expected.extend_from_slice(&[2u8; 1600]);
        assert_eq!(backend.writes(), vec![expected]);
        assert!(!events.contains(&PcmEvent::Drain));
        assert_eq!(events.last(), Some(&PcmEvent::ClosePlayback));
    }

    #[test]
    fn test_playback_not_started_when_inactive() {
        let dir = TempDir::new().unwrap();
        let backend = MockPcmBackend::new();
        let pipeline = PlaybackPipeline::new(Arc::new(backend.clone()), "default");
        let report = pipeline
            .run(wav_source(&dir, 100), &AtomicBool::new(false))
            .unwrap();
        assert!(report.stopped);
        assert!(backend.writes().is_empty());
    }

    #[test]
    fn test_unsupported_width_is_fatal_before_open() {
        let backend = MockPcmBackend::new();
        let pipeline = PlaybackPipeline::new(Arc::new(backend.clone()), "default");
        let active = Arc::new(AtomicBool::new(true));
        let source = EndlessSource {
            format: SoundFormat {
                channels: 1,
                rate: 8000,
                width: 5,
            },
            chunk: 10,
            produced: 0,
            stop_after: 0,
            active: active.clone(),
        };
        let err = pipeline.run(Box::new(source), &active).unwrap_err();
        assert_eq!(err, SoundError::UnsupportedSampleWidth(5));
        assert!(err.is_fatal());
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_device_error_ends_session() {
        let dir = TempDir::new().unwrap();
        let backend = MockPcmBackend::new().fail_write_after(1);
        let pipeline = PlaybackPipeline::new(Arc::new(backend.clone()), "default");
        let err = pipeline
            .run(wav_source(&dir, 4000), &AtomicBool::new(true))
            .unwrap_err();
        assert!(matches!(err, SoundError::Device { .. }));
        assert!(!err.is_fatal());
        assert_eq!(backend.writes().len(), 1);
        assert_eq!(backend.events().last(), Some(&PcmEvent::ClosePlayback));
    }

    #[test]
    fn test_sub_10hz_wav_rejected_before_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slow.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [100i16, 200, 300, 400] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let backend = MockPcmBackend::new();
        let pipeline = PlaybackPipeline::new(Arc::new(backend.clone()), "default");
        let source = Box::new(WavSource::open(&path).unwrap());
        let err = pipeline.run(source, &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, SoundError::UnsupportedFormat(_)));
        assert!(err.is_fatal());
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_mp3_playback_writes_fixed_periods() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/silence_44k_mono.mp3");

        let mut decoded = 0;
        let mut reference = Mp3Source::open(&path).unwrap();
        let format = reference.format();
        assert_eq!(
            format,
            SoundFormat {
                channels: 1,
                rate: 44100,
                width: 2,
            }
        );
        while let Some(chunk) = reference.next_chunk().unwrap() {
            assert_eq!(chunk.len() % 2, 0);
            decoded += chunk.len();
        }
        assert!(decoded > 0);

        let backend = MockPcmBackend::new();
        let pipeline = PlaybackPipeline::new(Arc::new(backend.clone()), "plughw:CARD=test");
        let source = Box::new(Mp3Source::open(&path).unwrap());
        let report = pipeline.run(source, &AtomicBool::new(true)).unwrap();

        // 44100 Hz 单声道 16 位：周期 4410 帧 = 8820 字节
        let period_bytes = 4410 * 2;
        let writes = backend.writes();
        assert_eq!(writes.len(), decoded.div_ceil(period_bytes));
        assert!(writes.iter().all(|w| w.len() == period_bytes));
        assert_eq!(report.periods, writes.len());
        assert!(!report.stopped);
        assert_eq!(report.padding, writes.len() * period_bytes - decoded);
        assert!(report.padding > 0);
        let last = writes.last().unwrap();
        assert!(last[period_bytes - report.padding..].iter().all(|&b| b == 0));

        let events = backend.events();
        assert!(matches!(
            &events[0],
            PcmEvent::OpenPlayback { params, .. } if params.period_frames == 4410 && params.channels == 1
        ));
        assert_eq!(events[events.len() - 2], PcmEvent::Drain);
        assert_eq!(events[events.len() - 1], PcmEvent::ClosePlayback);
    }

    #[test]
    fn test_chunker_exact_periods() {
        let mut chunker = PeriodChunker::new(4);
        chunker.push(&[1, 2, 3]);
        assert_eq!(chunker.pop_period(), None);
        chunker.push(&[4, 5, 6, 7, 8, 9]);
        assert_eq!(chunker.pop_period(), Some(vec![1, 2, 3, 4]));
        assert_eq!(chunker.pop_period(), Some(vec![5, 6, 7, 8]));
        assert_eq!(chunker.pop_period(), None);
        assert_eq!(chunker.pending_len(), 1);

        assert_eq!(chunker.finish(), Some((vec![9, 0, 0, 0], 3)));
        assert_eq!(chunker.finish(), None);
    }

    #[test]
    fn test_chunker_no_padding_when_aligned() {
        let mut chunker = PeriodChunker::new(2);
        chunker.push(&[1, 2]);
        assert!(chunker.pop_period().is_some());
        assert_eq!(chunker.finish(), None);
    }
}
