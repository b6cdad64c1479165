//! OpenCV 相机后端

use crate::{CameraSettings, CaptureDevice, DeviceError, DeviceErrorKind, IoError};
use fieldbot_protocol::Frame;
use opencv::{
    core::{self, Mat, MatTraitConst, MatTraitConstManual},
    imgproc,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use tracing::{debug, warn};

impl From<opencv::Error> for IoError {
    fn from(err: opencv::Error) -> Self {
        IoError::Device(DeviceError::new(DeviceErrorKind::Backend, err.to_string()))
    }
}

/// 基于 `VideoCapture` 的 BGR 相机
///
/// 输出尺寸与设置不一致时缩放到目标尺寸。
pub struct OpenCvCamera {
    cap: VideoCapture,
    frame: Mat,
    scratch: Mat,
    width: usize,
    height: usize,
}

// VideoCapture 只在采集线程中使用
unsafe impl Send for OpenCvCamera {}

impl OpenCvCamera {
    /// 打开相机并尽力应用参数
    ///
    /// 参数设置失败只记录日志；打不开设备才返回错误。
    pub fn open(settings: &CameraSettings) -> Result<Self, IoError> {
        let cap = VideoCapture::new(settings.index, videoio::CAP_ANY)?;
        if !cap.is_opened()? {
            return Err(IoError::Device(DeviceError::new(
                DeviceErrorKind::NotFound,
                format!("camera #{} could not be opened", settings.index),
            )));
        }

        let mut camera = Self {
            cap,
            frame: Mat::default(),
            scratch: Mat::default(),
            width: settings.width,
            height: settings.height,
        };
        camera.configure(settings);
        Ok(camera)
    }

    fn configure(&mut self, settings: &CameraSettings) {
        let props = [
            ("width", videoio::CAP_PROP_FRAME_WIDTH, settings.width as f64),
            ("height", videoio::CAP_PROP_FRAME_HEIGHT, settings.height as f64),
            ("saturation", videoio::CAP_PROP_SATURATION, settings.saturation),
            ("contrast", videoio::CAP_PROP_CONTRAST, settings.contrast),
            ("brightness", videoio::CAP_PROP_BRIGHTNESS, settings.brightness),
        ];
        for (name, prop, value) in props {
            match self.cap.set(prop, value) {
                Ok(true) => debug!("Camera {} set to {}", name, value),
                Ok(false) => warn!("Camera ignored {} = {}", name, value),
                Err(e) => warn!("Failed to set camera {}: {}", name, e),
            }
        }
    }
}

impl CaptureDevice for OpenCvCamera {
    fn read_frame(&mut self) -> Result<Frame, IoError> {
        if !self.cap.read(&mut self.frame)? {
            return Err(IoError::FrameDropped);
        }
        let size = self.frame.size()?;
        if size.width <= 0 || size.height <= 0 || self.frame.channels() != 3 {
            return Err(IoError::FrameDropped);
        }

        let working = if size.width as usize != self.width || size.height as usize != self.height {
            imgproc::resize(
                &self.frame,
                &mut self.scratch,
                core::Size {
                    width: self.width as i32,
                    height: self.height as i32,
                },
                0.0,
                0.0,
                imgproc::INTER_LINEAR,
            )?;
            &self.scratch
        } else {
            &self.frame
        };

        let data = working.data_bytes()?.to_vec();
        Frame::from_raw(self.height, self.width, data).map_err(|_| IoError::FrameDropped)
    }
}
