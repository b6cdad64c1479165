//! 面向行的读取缓冲
//!
//! 串口读超时可能发生在一行中间，这里把半行保留下来，拼上后续字节再切分。

use crate::IoError;
use std::io::{ErrorKind, Read};

/// 无换行时的最长缓冲，超过后整体作为一行交出（通常是噪声）
pub const MAX_LINE_LEN: usize = 4096;

/// 带半行缓冲的行读取器
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// 缓冲中尚未成行的字节数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 读取一行（去掉 `\r\n`）
    ///
    /// # 错误
    /// - `IoError::Timeout`: 底层读超时或 EOF，半行保留
    /// - `IoError::Io`: 其他读错误
    pub fn read_line(&mut self) -> Result<String, IoError> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(Self::decode(&line));
            }
            if self.pending.len() >= MAX_LINE_LEN {
                let line = std::mem::take(&mut self.pending);
                return Ok(Self::decode(&line));
            }

            let mut chunk = [0u8; 256];
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(IoError::Timeout),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Err(IoError::Timeout);
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(IoError::Io(e)),
            }
        }
    }

    fn decode(line: &[u8]) -> String {
        String::from_utf8_lossy(line).trim_end_matches(['\r', '\n']).to_string()
    }
}
