//! 语音识别桥接
//!
//! 声学模型本身在外部，通过 [`SpeechDecoder`] 接入。所有解码调用在同一个
//! 后台线程上串行执行：录音回调只投递数据（不阻塞），查询结果时按需等待
//! 已投递的数据解码完成。

use crate::SoundError;
use crate::record::RECORD_RATE;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// 在线语音解码器
pub trait SpeechDecoder: Send + 'static {
    /// 解码一段采样（原始 16 位数值转换的 f32，不归一化）
    fn decode(&mut self, rate: u32, samples: &[f32], finalize: bool) -> Result<(), SoundError>;

    /// 当前识别结果
    fn decoded_text(&mut self) -> Result<String, SoundError>;
}

enum AsrJob {
    Chunk { pcm: Vec<u8>, finalize: bool },
    Query(Sender<String>),
}

/// 语音识别桥
pub struct Asr {
    jobs: Option<Sender<AsrJob>>,
    latest: Arc<Mutex<String>>,
    thread: Option<JoinHandle<()>>,
}

/// S16LE 字节转换为 f32 采样（保持原始数值范围）
pub fn pcm_to_samples(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32)
        .collect()
}

impl Asr {
    /// 启动解码线程
    pub fn spawn(decoder: impl SpeechDecoder) -> Result<Self, SoundError> {
        let (jobs, jobs_rx) = crossbeam_channel::unbounded();
        let latest = Arc::new(Mutex::new(String::new()));
        let cache = latest.clone();
        let thread = std::thread::Builder::new()
            .name("asr-decoder".into())
            .spawn(move || decode_loop(decoder, jobs_rx, cache))
            .map_err(|e| SoundError::Worker(e.to_string()))?;
        Ok(Self {
            jobs: Some(jobs),
            latest,
            thread: Some(thread),
        })
    }

    /// 投递一段录音数据（不等待解码）
    pub fn submit_chunk(&self, pcm: &[u8], finalize: bool) {
        let job = AsrJob::Chunk {
            pcm: pcm.to_vec(),
            finalize,
        };
        if self.jobs.as_ref().is_none_or(|jobs| jobs.send(job).is_err()) {
            warn!("ASR decoder closed, chunk dropped");
        }
    }

    /// 识别结果
    ///
    /// - `blocking = true`: 等待之前投递的数据全部解码后返回（会阻塞当前线程）
    /// - `blocking = false`: 立即返回最近一次解码后的结果
    pub fn decoded_text(&self, blocking: bool) -> String {
        if blocking {
            let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
            if let Some(jobs) = self.jobs.as_ref()
                && jobs.send(AsrJob::Query(reply_tx)).is_ok()
                && let Ok(text) = reply_rx.recv()
            {
                return text;
            }
            warn!("ASR decoder closed, returning cached result");
        }
        self.latest.lock().clone()
    }

    /// 作为录音帧消费者使用
    pub fn consumer(self: &Arc<Self>) -> impl FnMut(&[u8], bool) + Send + 'static {
        let asr = self.clone();
        move |pcm, finalize| asr.submit_chunk(pcm, finalize)
    }
}

impl Drop for Asr {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            error!("ASR decoder thread panicked");
        }
    }
}

fn decode_loop(mut decoder: impl SpeechDecoder, jobs: Receiver<AsrJob>, latest: Arc<Mutex<String>>) {
    info!("ASR decoder started");
    while let Ok(job) = jobs.recv() {
        match job {
            AsrJob::Chunk { pcm, finalize } => {
                let samples = pcm_to_samples(&pcm);
                if let Err(e) = decoder.decode(RECORD_RATE, &samples, finalize) {
                    error!("ASR decode failed: {}", e);
                    continue;
                }
                match decoder.decoded_text() {
                    Ok(text) => *latest.lock() = text,
                    Err(e) => error!("ASR result unavailable: {}", e),
                }
                if finalize {
                    debug!("ASR utterance finalized");
                }
            },
            AsrJob::Query(reply) => {
                let text = decoder.decoded_text().unwrap_or_else(|e| {
                    error!("ASR result unavailable: {}", e);
                    latest.lock().clone()
                });
                let _ = reply.send(text);
            },
        }
    }
    info!("ASR decoder exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// 记录采样并把每个采样值拼接成文本
    struct EchoDecoder {
        samples: Vec<f32>,
        finalized: bool,
        delay: Duration,
    }

    impl SpeechDecoder for EchoDecoder {
        fn decode(&mut self, rate: u32, samples: &[f32], finalize: bool) -> Result<(), SoundError> {
            assert_eq!(rate, 16_000);
            std::thread::sleep(self.delay);
            self.samples.extend_from_slice(samples);
            self.finalized |= finalize;
            Ok(())
        }

        fn decoded_text(&mut self) -> Result<String, SoundError> {
            let words: Vec<String> = self.samples.iter().map(|s| s.to_string()).collect();
            let mut text = words.join(" ");
            if self.finalized {
                text.push('.');
            }
            Ok(text)
        }
    }

    fn echo(delay: Duration) -> EchoDecoder {
        EchoDecoder {
            samples: Vec::new(),
            finalized: false,
            delay,
        }
    }

    #[test]
    fn test_pcm_to_samples() {
        assert_eq!(
            pcm_to_samples(&[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0x7F]),
            vec![1.0, -1.0, -32768.0]
        );
    }

    #[test]
    fn test_blocking_query_waits_for_pending_chunks() {
        let asr = Asr::spawn(echo(Duration::from_millis(20))).unwrap();
        asr.submit_chunk(&[1, 0], false);
        asr.submit_chunk(&[2, 0], false);
        asr.submit_chunk(&[3, 0], true);
        assert_eq!(asr.decoded_text(true), "1 2 3.");
        assert_eq!(asr.decoded_text(false), "1 2 3.");
    }

    #[test]
    fn test_non_blocking_query_returns_cached() {
        let asr = Asr::spawn(echo(Duration::from_millis(200))).unwrap();
        assert_eq!(asr.decoded_text(false), "");
        asr.submit_chunk(&[7, 0], false);
        // 解码尚未完成
        assert_eq!(asr.decoded_text(false), "");
        assert_eq!(asr.decoded_text(true), "7");
    }

    #[test]
    fn test_consumer_adapter() {
        let asr = Arc::new(Asr::spawn(echo(Duration::ZERO)).unwrap());
        let mut consumer = asr.consumer();
        consumer(&[5, 0, 6, 0], false);
        consumer(&[], true);
        assert_eq!(asr.decoded_text(true), "5 6.");
    }
}
