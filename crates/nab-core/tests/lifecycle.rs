//! 硬件生命周期与跨资源并发测试（mock GPIO + 耳朵模拟器 + mock PCM）

use nab_core::{CoreError, Ear, NabConfig, NabCore, Rotation, SessionOutcome};
use nab_gpio::mock::{EarSimulator, MockBoard, MockHandle};
use nab_sound::SoundError;
use nab_sound::mock::{MockPcmBackend, PcmEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const STEPS: u32 = 8;

fn config() -> NabConfig {
    r#"
        hardware_model = "2019_tagtag"

        [ears]
        steps = 8
        missing_hole_threshold_ms = 95
        poll_interval_ms = 70
        homing_timeout_ms = 10000
    "#
    .parse()
    .unwrap()
}

fn write_wav(dir: &TempDir, frames: usize) -> PathBuf {
    let path = dir.path().join("tone.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        let sample = ((i as f32 * 0.05).sin() * 8000.0) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn start(backend: &MockPcmBackend) -> (NabCore, MockHandle, EarSimulator) {
    let (board, handle) = MockBoard::new();
    let core = NabCore::initialize(&config(), board, Arc::new(backend.clone())).unwrap();
    let sim = EarSimulator::start(handle.clone(), STEPS, Duration::from_millis(50), [1, 4]);
    (core, handle, sim)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ears_and_audio_run_concurrently() {
    let dir = TempDir::new().unwrap();
    // 22050 Hz 立体声：周期 2205 帧 = 8820 字节
    let path = write_wav(&dir, 22_050);
    let backend = MockPcmBackend::new().with_write_delay(Duration::from_millis(10));
    let (core, _handle, sim) = start(&backend);

    core.audio().start_playing_preloaded(&path).await.unwrap();
    let position = core.ears().goto(Ear::Left, 6, Rotation::Forward).await.unwrap();
    assert_eq!(position, 6);
    assert_eq!(sim.position(Ear::Left), 6);

    let outcome = core.audio().wait_until_done().await.unwrap();
    assert_eq!(outcome, Some(SessionOutcome::Completed));
    let writes = backend.writes();
    assert_eq!(writes.len(), 10);
    assert!(writes.iter().all(|w| w.len() == 8820));

    core.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_stops_everything() {
    let dir = TempDir::new().unwrap();
    let path = write_wav(&dir, 22_050 * 10);
    let backend = MockPcmBackend::new().with_write_delay(Duration::from_millis(20));
    let (core, handle, _sim) = start(&backend);

    core.audio().start_playing_preloaded(&path).await.unwrap();
    core.ears().detect_positions().await.unwrap();
    core.shutdown().await;

    assert!(!core.audio().is_busy().await);
    assert_eq!(backend.events().last(), Some(&PcmEvent::ClosePlayback));
    assert!(handle.is_released());
    assert!(core.ears().is_shut_down());

    // 关闭后耳朵操作失败
    let err = core.ears().go(Ear::Right, 3, Rotation::Forward).await.unwrap_err();
    assert!(matches!(err, CoreError::Ears(_)));
}

#[test]
fn test_self_test_failure_aborts_initialization() {
    let (board, handle) = MockBoard::new();
    let backend = MockPcmBackend::new().reject(1, 16_000);
    let err = NabCore::initialize(&config(), board, Arc::new(backend))
        .err()
        .unwrap();
    assert!(matches!(err, CoreError::Sound(SoundError::SelfTest(_))));
    assert!(err.is_fatal());
    // 自检先于 GPIO 配置
    assert!(!handle.has_callback(Ear::Left));
}

#[test]
fn test_edge_detection_failure_is_fatal() {
    let (board, _handle) = MockBoard::new();
    let err = NabCore::initialize(
        &config(),
        board.failing_edge_detection(),
        Arc::new(MockPcmBackend::new()),
    )
    .err()
    .unwrap();
    assert!(matches!(err, CoreError::Ears(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_drop_releases_gpio() {
    let backend = MockPcmBackend::new();
    let (board, handle) = MockBoard::new();
    let core = NabCore::initialize(&config(), board, Arc::new(backend)).unwrap();
    assert!(handle.has_callback(Ear::Right));
    drop(core);
    assert!(handle.is_released());
}
