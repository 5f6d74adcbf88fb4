//! Mock PCM 后端
//!
//! 记录设备打开 / 写入 / 排空 / 关闭事件，用于验证周期切分和会话互斥。
//! 录音流按采样序号生成递增的 S16LE 数据。

use crate::SoundError;
use crate::backend::{PcmBackend, PcmReader, PcmWriter};
use crate::format::PcmParams;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// 设备事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PcmEvent {
    OpenPlayback { device: String, params: PcmParams },
    Write(Vec<u8>),
    Drain,
    ClosePlayback,
    OpenCapture { device: String, params: PcmParams },
    Read(usize),
    CloseCapture,
}

/// Mock PCM 后端
///
/// 克隆共享同一份事件记录。
#[derive(Clone)]
pub struct MockPcmBackend {
    cards: Vec<String>,
    write_delay: Duration,
    read_delay: Duration,
    fail_write_after: Option<usize>,
    fail_read_after: Option<usize>,
    rejected: Vec<(u16, u32)>,
    events: Arc<Mutex<Vec<PcmEvent>>>,
}

impl Default for MockPcmBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPcmBackend {
    /// 默认声卡 `seeed2micvoicec`，写入无延迟，每次读取耗时 10ms
    pub fn new() -> Self {
        Self {
            cards: vec![crate::MODEL_2019_CARD_NAME.to_string()],
            write_delay: Duration::ZERO,
            read_delay: Duration::from_millis(10),
            fail_write_after: None,
            fail_read_after: None,
            rejected: Vec::new(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_cards(mut self, cards: &[&str]) -> Self {
        self.cards = cards.iter().map(|c| c.to_string()).collect();
        self
    }

    /// 每次写入的耗时（模拟实时播放）
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// 每次读取的耗时（模拟实时录音）
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// 写入 `n` 个周期后返回设备错误
    pub fn fail_write_after(mut self, n: usize) -> Self {
        self.fail_write_after = Some(n);
        self
    }

    /// 读取 `n` 个周期后返回设备错误
    pub fn fail_read_after(mut self, n: usize) -> Self {
        self.fail_read_after = Some(n);
        self
    }

    /// 拒绝指定的 (声道数, 采样率) 组合
    pub fn reject(mut self, channels: u16, rate: u32) -> Self {
        self.rejected.push((channels, rate));
        self
    }

    pub fn events(&self) -> Vec<PcmEvent> {
        self.events.lock().clone()
    }

    /// 所有写入的周期数据
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PcmEvent::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    fn check(&self, device: &str, params: &PcmParams) -> Result<(), SoundError> {
        if device == "null" {
            return Err(SoundError::device(device, "no such device"));
        }
        if self.rejected.contains(&(params.channels, params.rate)) {
            return Err(SoundError::device(
                device,
                format!("{} Hz x{} not supported", params.rate, params.channels),
            ));
        }
        Ok(())
    }
}

impl PcmBackend for MockPcmBackend {
    fn open_playback(
        &self,
        device: &str,
        params: &PcmParams,
    ) -> Result<Box<dyn PcmWriter>, SoundError> {
        self.check(device, params)?;
        self.events.lock().push(PcmEvent::OpenPlayback {
            device: device.to_string(),
            params: *params,
        });
        Ok(Box::new(MockWriter {
            device: device.to_string(),
            events: self.events.clone(),
            delay: self.write_delay,
            remaining: self.fail_write_after,
        }))
    }

    fn open_capture(
        &self,
        device: &str,
        params: &PcmParams,
    ) -> Result<Box<dyn PcmReader>, SoundError> {
        self.check(device, params)?;
        self.events.lock().push(PcmEvent::OpenCapture {
            device: device.to_string(),
            params: *params,
        });
        Ok(Box::new(MockReader {
            device: device.to_string(),
            events: self.events.clone(),
            delay: self.read_delay,
            remaining: self.fail_read_after,
            counter: 0,
        }))
    }

    fn card_names(&self) -> Result<Vec<String>, SoundError> {
        Ok(self.cards.clone())
    }
}

struct MockWriter {
    device: String,
    events: Arc<Mutex<Vec<PcmEvent>>>,
    delay: Duration,
    remaining: Option<usize>,
}

impl PcmWriter for MockWriter {
    fn write(&mut self, period: &[u8]) -> Result<(), SoundError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(SoundError::device(&self.device, "simulated I/O error"));
            }
            *remaining -= 1;
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.events.lock().push(PcmEvent::Write(period.to_vec()));
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SoundError> {
        self.events.lock().push(PcmEvent::Drain);
        Ok(())
    }
}

impl Drop for MockWriter {
    fn drop(&mut self) {
        self.events.lock().push(PcmEvent::ClosePlayback);
    }
}

struct MockReader {
    device: String,
    events: Arc<Mutex<Vec<PcmEvent>>>,
    delay: Duration,
    remaining: Option<usize>,
    counter: i16,
}

impl PcmReader for MockReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SoundError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(SoundError::device(&self.device, "simulated overrun"));
            }
            *remaining -= 1;
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        for sample in buf.chunks_exact_mut(2) {
            sample.copy_from_slice(&self.counter.to_le_bytes());
            self.counter = self.counter.wrapping_add(1);
        }
        let read = buf.len() - buf.len() % 2;
        self.events.lock().push(PcmEvent::Read(read));
        Ok(read)
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.events.lock().push(PcmEvent::CloseCapture);
    }
}
