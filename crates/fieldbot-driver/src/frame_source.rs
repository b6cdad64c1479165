//! 帧采集
//!
//! 后台线程持续读取相机，把最新一帧发布到单槽 `ArcSwap<Frame>`。
//! 读者拿到的是完整帧的 `Arc` 快照，写者只做一次原子指针替换，不会出现撕裂的帧。
//!
//! 任何读取失败或形状不符都发布全零帧；控制循环永远能拿到一帧。

use crate::cancel::CancelToken;
use crate::error::DriverError;
use crate::metrics::{CaptureMetrics, bump};
use arc_swap::ArcSwap;
use fieldbot_io::{CaptureDevice, IoError};
use fieldbot_protocol::Frame;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 帧采集配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSourceConfig {
    pub height: usize,
    pub width: usize,
    /// 两次读取之间的间隔
    pub poll_interval: Duration,
}

impl Default for FrameSourceConfig {
    fn default() -> Self {
        Self {
            height: 480,
            width: 640,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// 最新帧来源
///
/// - `spawn`: 启动采集线程
/// - `disabled`: 无相机（配送机器人或相机打开失败），槽位永远是全零帧
pub struct FrameSource {
    slot: Arc<ArcSwap<Frame>>,
    config: FrameSourceConfig,
    metrics: Arc<CaptureMetrics>,
    stop: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl FrameSource {
    /// 不采集，`latest()` 始终返回全零帧
    pub fn disabled(config: FrameSourceConfig) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(Frame::zeros(config.height, config.width))),
            config,
            metrics: Arc::new(CaptureMetrics::default()),
            stop: CancelToken::new(),
            thread: None,
        }
    }

    /// 启动采集线程
    ///
    /// `shutdown` 被取消或 `FrameSource` 被 drop 时线程退出。
    pub fn spawn<D>(
        device: D,
        config: FrameSourceConfig,
        shutdown: CancelToken,
    ) -> Result<Self, DriverError>
    where
        D: CaptureDevice + 'static,
    {
        let mut source = Self::disabled(config);

        let ctx = CaptureContext {
            slot: source.slot.clone(),
            config: source.config.clone(),
            metrics: source.metrics.clone(),
            stop: source.stop.clone(),
            shutdown,
        };

        let handle = std::thread::Builder::new()
            .name("fieldbot-capture".to_string())
            .spawn(move || capture_loop(device, ctx))
            .map_err(|e| DriverError::IoThread(e.to_string()))?;

        info!(
            "Frame capture started ({}x{}, every {:?})",
            source.config.width, source.config.height, source.config.poll_interval
        );
        source.thread = Some(handle);
        Ok(source)
    }

    /// 最新帧快照（无锁）
    pub fn latest(&self) -> Arc<Frame> {
        self.slot.load_full()
    }

    /// 采集线程是否仍在运行
    pub fn is_capturing(&self) -> bool {
        self.thread.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.config.height, self.config.width)
    }

    pub fn metrics(&self) -> Arc<CaptureMetrics> {
        self.metrics.clone()
    }

    /// 停止采集并等待线程退出
    pub fn stop(&mut self) {
        self.stop.cancel();

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.thread.take()
            && let Err(e) = join_timeout_of(handle, join_timeout)
        {
            error!("Capture thread {} within {:?}", e, join_timeout);
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureContext {
    slot: Arc<ArcSwap<Frame>>,
    config: FrameSourceConfig,
    metrics: Arc<CaptureMetrics>,
    stop: CancelToken,
    shutdown: CancelToken,
}

impl CaptureContext {
    fn should_exit(&self) -> bool {
        self.stop.is_cancelled() || self.shutdown.is_cancelled()
    }
}

fn capture_loop<D: CaptureDevice>(mut device: D, ctx: CaptureContext) {
    let (height, width) = (ctx.config.height, ctx.config.width);
    // 当前连续丢帧数，只在开始和恢复时各打一条日志
    let mut dropped_streak: u64 = 0;

    while !ctx.should_exit() {
        let next = match device.read_frame() {
            Ok(frame) if frame.has_shape(height, width) => Ok(frame),
            Ok(frame) => {
                bump(&ctx.metrics.shape_mismatches);
                let (h, w, _) = frame.shape();
                debug!("Discarding {}x{} frame, expected {}x{}", w, h, width, height);
                Err(IoError::FrameDropped)
            },
            Err(e) => Err(e),
        };

        match next {
            Ok(frame) => {
                if dropped_streak > 0 {
                    info!("Camera recovered after {} dropped frames", dropped_streak);
                    dropped_streak = 0;
                }
                bump(&ctx.metrics.frames_captured);
                ctx.slot.store(Arc::new(frame));
            },
            Err(e) => {
                if dropped_streak == 0 {
                    warn!("Camera read failed: {}, publishing blank frames", e);
                } else {
                    trace!("Camera read failed: {}", e);
                }
                dropped_streak += 1;
                bump(&ctx.metrics.frames_dropped);
                ctx.slot.store(Arc::new(Frame::zeros(height, width)));
            },
        }

        if ctx.stop.sleep(ctx.config.poll_interval) {
            break;
        }
    }

    debug!("Capture thread exiting");
}

/// 带超时的 join；超时后看门狗线程继续等待，进程退出时由系统回收
fn join_timeout_of(handle: JoinHandle<()>, timeout: Duration) -> Result<(), &'static str> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let _ = tx.send(handle.join());
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err("panicked"),
        Err(_) => Err("failed to shut down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_io::mock::MockCamera;
    use std::time::Instant;

    fn small_config() -> FrameSourceConfig {
        FrameSourceConfig {
            height: 2,
            width: 3,
            poll_interval: Duration::from_millis(1),
        }
    }

    fn filled(height: usize, width: usize, value: u8) -> Frame {
        Frame::from_raw(height, width, vec![value; height * width * 3]).unwrap()
    }

    /// 轮询直到条件成立或超时
    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_disabled_source_always_zero() {
        let source = FrameSource::disabled(small_config());
        let frame = source.latest();
        assert!(frame.has_shape(2, 3));
        assert!(frame.is_zero());
        assert!(!source.is_capturing());
    }

    #[test]
    fn test_latest_frame_is_published() {
        let (camera, handle) = MockCamera::new();
        handle.set_repeat(Some(filled(2, 3, 7)));

        let source = FrameSource::spawn(camera, small_config(), CancelToken::new()).unwrap();
        assert!(wait_until(|| source.latest().sample(1, 2, 0) == Some(7)));
        assert!(source.metrics().snapshot().frames_captured > 0);
    }

    #[test]
    fn test_dropped_frame_becomes_zero() {
        let (camera, handle) = MockCamera::new();
        handle.push_frame(filled(2, 3, 9));
        // 脚本耗尽后一直丢帧
        handle.set_repeat(None);

        let source = FrameSource::spawn(camera, small_config(), CancelToken::new()).unwrap();
        assert!(wait_until(|| source.metrics().snapshot().frames_dropped > 0));

        let frame = source.latest();
        assert!(frame.has_shape(2, 3));
        assert!(frame.is_zero());
    }

    #[test]
    fn test_recovers_after_dropped_frames() {
        let (camera, handle) = MockCamera::new();
        handle.push_frame(filled(2, 3, 9));
        handle.push_drop();
        handle.push_drop();
        handle.push_drop();
        handle.set_repeat(Some(filled(2, 3, 5)));

        let source = FrameSource::spawn(camera, small_config(), CancelToken::new()).unwrap();
        assert!(wait_until(|| {
            handle.remaining() == 0 && source.latest().sample(0, 0, 0) == Some(5)
        }));

        let snapshot = source.metrics().snapshot();
        assert_eq!(snapshot.frames_dropped, 3);
        assert!(snapshot.frames_captured >= 2);
    }

    #[test]
    fn test_latest_is_never_torn() {
        const H: usize = 48;
        const W: usize = 64;
        const SWAPS: usize = 400;

        let (camera, handle) = MockCamera::new();
        for i in 0..SWAPS {
            handle.push_frame(filled(H, W, if i % 2 == 0 { 0x11 } else { 0xEE }));
        }
        handle.set_repeat(Some(filled(H, W, 0x11)));

        let config = FrameSourceConfig {
            height: H,
            width: W,
            poll_interval: Duration::ZERO,
        };
        let source = FrameSource::spawn(camera, config, CancelToken::new()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut snapshots = 0;
        loop {
            let frame = source.latest();
            let bytes = frame.as_bytes();
            assert!(frame.has_shape(H, W));
            assert!(
                bytes.iter().all(|&b| b == bytes[0]),
                "torn frame after {} snapshots",
                snapshots
            );
            snapshots += 1;

            if handle.remaining() == 0 || Instant::now() > deadline {
                break;
            }
        }
        assert_eq!(handle.remaining(), 0);
    }

    #[test]
    fn test_wrong_shape_replaced_with_zero() {
        let (camera, handle) = MockCamera::new();
        handle.set_repeat(Some(filled(4, 4, 1)));

        let source = FrameSource::spawn(camera, small_config(), CancelToken::new()).unwrap();
        assert!(wait_until(|| source.metrics().snapshot().shape_mismatches > 0));
        assert!(source.latest().is_zero());
        assert!(source.latest().has_shape(2, 3));
    }

    #[test]
    fn test_shutdown_token_stops_thread() {
        let (camera, handle) = MockCamera::new();
        handle.set_repeat(Some(filled(2, 3, 1)));
        let shutdown = CancelToken::new();

        let source = FrameSource::spawn(camera, small_config(), shutdown.clone()).unwrap();
        assert!(wait_until(|| handle.reads() > 0));

        shutdown.cancel();
        assert!(wait_until(|| !source.is_capturing()));

        let reads = handle.reads();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(handle.reads(), reads);
    }

    #[test]
    fn test_drop_joins_thread() {
        let (camera, handle) = MockCamera::new();
        handle.set_repeat(Some(filled(2, 3, 1)));

        let source = FrameSource::spawn(camera, small_config(), CancelToken::new()).unwrap();
        assert!(wait_until(|| handle.reads() > 0));
        drop(source);

        let reads = handle.reads();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(handle.reads(), reads);
    }
}
