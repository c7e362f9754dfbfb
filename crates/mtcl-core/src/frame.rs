//! 流式传输上的消息分帧：8 字节大端长度头 + 载荷，`0` 表示 EOS。
//!
//! 对应 spec.md §4.2/§6.3：仅流式传输（TCP/TLS/...）需要这一层；消息式传输
//! （MQTT、MPI 等）原生携带边界，不经过本模块。
use std::io::{self, Read, Write};

/// 长度头的字节宽度：一个大端 `u64`。
pub const HEADER_LEN: usize = 8;

/// 将 `payload` 的长度编码为大端 `u64` 前缀，写入 `out`。
pub fn write_header(out: &mut impl Write, payload_len: u64) -> io::Result<()> {
    out.write_all(&payload_len.to_be_bytes())
}

/// 便捷封装：写入长度头与载荷。空载荷（`len == 0`）即 EOS 帧。
pub fn write_frame(out: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    write_header(out, payload.len() as u64)?;
    out.write_all(payload)
}

/// 从 `input` 读取一个长度头，返回载荷字节数；`0` 表示 EOS。
///
/// 读取不到完整的 8 字节头（对端半关闭/重置）时，将 `UnexpectedEof` 同样视为
/// EOS——这与 spec.md §7 "`peer-reset` 在读路径上被折算为 `end-of-stream`" 一致。
pub fn read_header(input: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; HEADER_LEN];
    match input.read_exact(&mut buf) {
        Ok(()) => Ok(u64::from_be_bytes(buf)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
        Err(e) => Err(e),
    }
}

/// 跨多次非阻塞 `read` 调用持久化长度头读取进度的状态机。
///
/// 对应驱动层的一个真实缺陷：把流短暂切到非阻塞态后做一次 `read_exact`，
/// 若 8 字节长度头跨 TCP 分段到达，`read_exact` 会先吞掉已到达的若干字节，
/// 再在剩余部分上报 `WouldBlock`——这些已读字节若无处安放，下次调用只能从
/// 头开始读，永久错位后续分帧。`HeaderReader` 把"已读到几个字节"存在自身里，
/// 使调用方可以在 `WouldBlock` 之后原样重试,从断点续读。
#[derive(Debug, Default)]
pub struct HeaderReader {
    buf: [u8; HEADER_LEN],
    filled: usize,
}

impl HeaderReader {
    pub const fn new() -> Self {
        Self { buf: [0u8; HEADER_LEN], filled: 0 }
    }

    /// 继续读取长度头。`Ok(Some(len))` 表示头已读全；`Ok(None)` 表示在读到
    /// 任何头字节之前就遇到了 EOF（对端有序关闭）。读到一部分后才 EOF 视为
    /// 连接在帧边界中间被截断，报告为错误而非 EOS，因为调用方无法再恢复出
    /// 一个完整的长度头。非阻塞输入在头读到一半时返回 `WouldBlock` 是正常
    /// 情况：`filled` 留在原地,下一次调用从断点继续。
    pub fn read(&mut self, input: &mut impl Read) -> io::Result<Option<u64>> {
        while self.filled < HEADER_LEN {
            match input.read(&mut self.buf[self.filled..]) {
                Ok(0) if self.filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed with a partial frame header",
                    ))
                }
                Ok(n) => self.filled += n,
                Err(e) => return Err(e),
            }
        }
        let header = u64::from_be_bytes(self.buf);
        self.filled = 0;
        Ok(Some(header))
    }
}

/// 读帧状态机维护的缓存：`probe` 已读出的长度头，`receive` 尚未消费。
///
/// 对应 spec.md §4.4 "probed" 字段：`probe` 必须幂等，直到 `receive` 消费为止。
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbedFrame {
    cached: Option<u64>,
}

impl ProbedFrame {
    pub const fn new() -> Self {
        Self { cached: None }
    }

    pub fn has_pending(&self) -> bool {
        self.cached.is_some()
    }

    pub fn pending_size(&self) -> Option<u64> {
        self.cached
    }

    /// 记录一个新探测到的长度头。重复调用在消费前是幂等的：第二次 `fill` 会
    /// 覆盖第一次的结果,但调用方（`Handle`）应保证在消费前不会重新探测底层流。
    pub fn fill(&mut self, size: u64) {
        self.cached = Some(size);
    }

    /// 消费缓存的长度头，返回其值。
    pub fn take(&mut self) -> Option<u64> {
        self.cached.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 只提供固定的一段字节，耗尽后报 `WouldBlock`，模拟一次非阻塞 `read`
    /// 调用只能看到对端已发出的那部分长度头。
    struct Pending<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl Read for Pending<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "no more bytes yet"));
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn header_reader_resumes_across_split_reads() {
        let payload_len: u64 = 42;
        let bytes = payload_len.to_be_bytes();
        let mut reader = HeaderReader::new();

        let mut first = Pending { data: &bytes[..3], pos: 0 };
        let err = reader.read(&mut first).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert_eq!(reader.filled, 3);

        let mut rest = Pending { data: &bytes[3..], pos: 0 };
        assert_eq!(reader.read(&mut rest).unwrap(), Some(payload_len));
    }

    #[test]
    fn header_reader_reports_eos_before_any_byte() {
        let mut input: &[u8] = &[];
        let mut reader = HeaderReader::new();
        assert_eq!(reader.read(&mut input).unwrap(), None);
    }

    #[test]
    fn header_reader_errors_on_truncated_header() {
        let mut input: &[u8] = &[0u8, 1, 2];
        let mut reader = HeaderReader::new();
        let err = reader.read(&mut input).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
