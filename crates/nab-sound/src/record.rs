//! 录音管线：单声道 16 kHz S16LE，每周期 1600 帧（100ms，3200 字节）

use crate::SoundError;
use crate::backend::PcmBackend;
use crate::format::PcmParams;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// 录音采样率
pub const RECORD_RATE: u32 = 16_000;

/// 录音周期帧数
pub const RECORD_PERIOD_FRAMES: usize = 1_600;

/// 帧消费者：`(pcm, is_final)`
///
/// 运行标志清除后恰好收到一次 `is_final = true` 的调用（数据可能为空）。
pub type FrameConsumer = Box<dyn FnMut(&[u8], bool) + Send + 'static>;

/// 录音结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordReport {
    /// 非最终回调次数
    pub periods: usize,
    pub bytes: usize,
}

/// 录音管线
#[derive(Clone)]
pub struct RecordPipeline {
    backend: Arc<dyn PcmBackend>,
    device: String,
}

impl RecordPipeline {
    pub fn new(backend: Arc<dyn PcmBackend>, device: impl Into<String>) -> Self {
        Self {
            backend,
            device: device.into(),
        }
    }

    /// 录音直到运行标志清除（阻塞，在音频线程上调用）
    ///
    /// 设备读取出错时同样向消费者发送一次空的最终回调，然后返回错误。
    pub fn run(
        &self,
        consumer: &mut (dyn FnMut(&[u8], bool) + Send),
        active: &AtomicBool,
    ) -> Result<RecordReport, SoundError> {
        let params = PcmParams::capture();
        let mut reader = self.backend.open_capture(&self.device, &params)?;
        info!("Recording on {} (16 kHz mono S16LE)", self.device);

        let mut buf = vec![0u8; params.period_bytes()];
        let mut report = RecordReport::default();
        loop {
            let read = match reader.read(&mut buf) {
                Ok(read) => read,
                Err(e) => {
                    error!("Capture on {} failed: {}", self.device, e);
                    consumer(&[], true);
                    return Err(e);
                },
            };
            let finalize = !active.load(Ordering::Acquire);
            if read > 0 || finalize {
                consumer(&buf[..read], finalize);
            }
            if finalize {
                break;
            }
            if read > 0 {
                report.periods += 1;
                report.bytes += read;
            }
        }
        debug!("Recording finished: {:?}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPcmBackend, PcmEvent};
    use std::time::Duration;

    #[test]
    fn test_record_periods_and_final_callback() {
        let backend = MockPcmBackend::new().with_read_delay(Duration::from_millis(5));
        let pipeline = RecordPipeline::new(Arc::new(backend.clone()), "plughw:CARD=test");
        let active = Arc::new(AtomicBool::new(true));

        let stopper = {
            let active = active.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(60));
                active.store(false, Ordering::Release);
            })
        };

        let mut calls: Vec<(usize, bool)> = Vec::new();
        let mut first_samples = Vec::new();
        let mut consumer = |data: &[u8], is_final: bool| {
            if first_samples.is_empty() {
                first_samples = data[..4].to_vec();
            }
            calls.push((data.len(), is_final));
        };
        let report = pipeline.run(&mut consumer, &active).unwrap();
        stopper.join().unwrap();

        let (last, rest) = calls.split_last().unwrap();
        assert!(last.1, "last callback must be final");
        assert!(!rest.is_empty());
        assert!(rest.iter().all(|&(len, is_final)| len == 3200 && !is_final));
        assert_eq!(report.periods, rest.len());
        assert_eq!(report.bytes, rest.len() * 3200);
        // 采样 0, 1
        assert_eq!(first_samples, vec![0, 0, 1, 0]);

        let events = backend.events();
        assert_eq!(
            events[0],
            PcmEvent::OpenCapture {
                device: "plughw:CARD=test".into(),
                params: PcmParams::capture()
            }
        );
        assert_eq!(events.last(), Some(&PcmEvent::CloseCapture));
    }

    #[test]
    fn test_record_stopped_before_first_read() {
        let backend = MockPcmBackend::new().with_read_delay(Duration::ZERO);
        let pipeline = RecordPipeline::new(Arc::new(backend), "default");
        let mut calls = Vec::new();
        let mut consumer = |data: &[u8], is_final: bool| calls.push((data.len(), is_final));
        pipeline.run(&mut consumer, &AtomicBool::new(false)).unwrap();
        // 恰好一次最终回调，携带最后读到的数据
        assert_eq!(calls, vec![(3200, true)]);
    }

    #[test]
    fn test_record_read_error_sends_final_callback() {
        let backend = MockPcmBackend::new()
            .with_read_delay(Duration::ZERO)
            .fail_read_after(3);
        let pipeline = RecordPipeline::new(Arc::new(backend.clone()), "default");
        let mut calls = Vec::new();
        let mut consumer = |data: &[u8], is_final: bool| calls.push((data.len(), is_final));
        let err = pipeline.run(&mut consumer, &AtomicBool::new(true)).unwrap_err();

        assert!(matches!(err, SoundError::Device { .. }));
        assert_eq!(calls, vec![(3200, false), (3200, false), (3200, false), (0, true)]);
        assert_eq!(backend.events().last(), Some(&PcmEvent::CloseCapture));
    }

    #[test]
    fn test_record_open_failure() {
        let pipeline = RecordPipeline::new(Arc::new(MockPcmBackend::new()), "null");
        let mut called = false;
        let mut consumer = |_: &[u8], _: bool| called = true;
        let err = pipeline.run(&mut consumer, &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, SoundError::Device { .. }));
        assert!(!called);
    }
}
