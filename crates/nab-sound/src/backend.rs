//! PCM 后端抽象
//!
//! 后端负责按 [`PcmParams`] 打开并配置设备；流在 drop 时关闭设备
//! （未排空的数据被丢弃）。

use crate::SoundError;
use crate::format::PcmParams;

/// 播放流
pub trait PcmWriter: Send {
    /// 写入一个完整周期（阻塞直到设备接收）
    fn write(&mut self, period: &[u8]) -> Result<(), SoundError>;

    /// 等待已写入的数据播放完毕
    fn drain(&mut self) -> Result<(), SoundError> {
        Ok(())
    }
}

/// 录音流
pub trait PcmReader: Send {
    /// 读取最多一个周期，返回读取的字节数（阻塞直到有数据）
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SoundError>;
}

/// PCM 后端
pub trait PcmBackend: Send + Sync {
    /// 打开播放设备
    ///
    /// 设备不接受请求的参数时返回错误。
    fn open_playback(&self, device: &str, params: &PcmParams)
    -> Result<Box<dyn PcmWriter>, SoundError>;

    /// 打开录音设备
    fn open_capture(&self, device: &str, params: &PcmParams)
    -> Result<Box<dyn PcmReader>, SoundError>;

    /// 系统中声卡的 ID 列表
    fn card_names(&self) -> Result<Vec<String>, SoundError>;
}
