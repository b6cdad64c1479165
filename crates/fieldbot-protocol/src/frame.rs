//! 图像帧
//!
//! 固定形状 `height × width × 3` 的 BGR 采样（行优先，交错存储）。
//! 线上格式为嵌套数组 `[[[b, g, r], ...], ...]`。

use crate::error::ProtocolError;
use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// 每个像素的通道数（BGR）
pub const CHANNELS: usize = 3;

/// BGR 图像帧
///
/// 构造时保证 `data.len() == height * width * 3`，之后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    height: usize,
    width: usize,
    data: Vec<u8>,
}

impl Frame {
    /// 全零帧（读帧失败时的替代值）
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![0; height * width * CHANNELS],
        }
    }

    /// 从交错的 BGR 字节构造
    ///
    /// # 错误
    /// - `ProtocolError::FrameShape`: 数据长度与形状不符
    pub fn from_raw(height: usize, width: usize, data: Vec<u8>) -> Result<Self, ProtocolError> {
        let expected = height * width * CHANNELS;
        if data.len() != expected {
            return Err(ProtocolError::FrameShape {
                height,
                width,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// 从嵌套像素数组构造（每行宽度必须一致）
    pub fn from_rows(rows: Vec<Vec<[u8; CHANNELS]>>) -> Result<Self, ProtocolError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(height * width * CHANNELS);
        for row in &rows {
            if row.len() != width {
                return Err(ProtocolError::FrameShape {
                    height,
                    width,
                    expected: height * width * CHANNELS,
                    actual: data.len() + row.len() * CHANNELS,
                });
            }
            for pixel in row {
                data.extend_from_slice(pixel);
            }
        }
        Self::from_raw(height, width, data)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, CHANNELS)
    }

    pub fn has_shape(&self, height: usize, width: usize) -> bool {
        self.height == height && self.width == width
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 单个采样值；越界返回 `None`
    pub fn sample(&self, y: usize, x: usize, channel: usize) -> Option<u8> {
        if y >= self.height || x >= self.width || channel >= CHANNELS {
            return None;
        }
        self.data.get((y * self.width + x) * CHANNELS + channel).copied()
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    fn row(&self, y: usize) -> &[u8] {
        let row_len = self.width * CHANNELS;
        &self.data[y * row_len..(y + 1) * row_len]
    }
}

struct RowRef<'a>(&'a [u8]);

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len() / CHANNELS))?;
        for pixel in self.0.chunks_exact(CHANNELS) {
            seq.serialize_element(pixel)?;
        }
        seq.end()
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut rows = serializer.serialize_seq(Some(self.height))?;
        for y in 0..self.height {
            rows.serialize_element(&RowRef(self.row(y)))?;
        }
        rows.end()
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<[u8; CHANNELS]>>::deserialize(deserializer)?;
        Frame::from_rows(rows).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(height: usize, width: usize) -> Frame {
        let data = (0..height * width * CHANNELS).map(|i| (i % 256) as u8).collect();
        Frame::from_raw(height, width, data).unwrap()
    }

    #[test]
    fn test_zeros_shape() {
        let frame = Frame::zeros(4, 6);
        assert_eq!(frame.shape(), (4, 6, 3));
        assert_eq!(frame.as_bytes().len(), 72);
        assert!(frame.is_zero());
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        let err = Frame::from_raw(2, 2, vec![0; 11]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FrameShape {
                expected: 12,
                actual: 11,
                ..
            }
        ));
    }

    #[test]
    fn test_sample_indexing() {
        let frame = gradient(2, 3);
        // (y=1, x=2, c=0) → (1*3 + 2)*3 = 15
        assert_eq!(frame.sample(1, 2, 0), Some(15));
        assert_eq!(frame.sample(0, 0, 2), Some(2));
        assert_eq!(frame.sample(2, 0, 0), None);
        assert_eq!(frame.sample(0, 0, 3), None);
    }

    #[test]
    fn test_json_layout_is_nested_hwc() {
        let frame = Frame::from_raw(1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, "[[[1,2,3],[4,5,6]]]");
    }

    #[test]
    fn test_json_decode_exact() {
        let frame = gradient(3, 4);
        let json = serde_json::to_vec(&frame).unwrap();
        let decoded: Frame = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_rejects_ragged_rows() {
        let result = serde_json::from_str::<Frame>("[[[1,2,3],[4,5,6]],[[7,8,9]]]");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_out_of_range_sample() {
        assert!(serde_json::from_str::<Frame>("[[[1,2,300]]]").is_err());
        assert!(serde_json::from_str::<Frame>("[[[1,2]]]").is_err());
    }
}
