//! 地址语法辅助：`SCHEME:rest`（spec.md §6.1）。
use crate::error::{ErrorKind, MtclError, Result};

/// 解析后的地址：协议前缀与其余部分的只读视图。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAddress<'a> {
    pub scheme: &'a str,
    pub rest: &'a str,
}

/// 解析 `SCHEME:rest` 形式的地址字符串。
///
/// 已注册的 scheme 示例见 spec.md §6.1：`TCP`、`MPI`、`MPIP2P`、`MQTT`、`UCX`、`SHM`。
/// 本函数只做语法切分，scheme 的注册校验由 [`crate::manager::Manager`] 完成。
pub fn parse_address(address: &str) -> Result<ParsedAddress<'_>> {
    match address.find(':') {
        Some(idx) if idx > 0 => Ok(ParsedAddress {
            scheme: &address[..idx],
            rest: &address[idx + 1..],
        }),
        _ => Err(MtclError::new(
            ErrorKind::InvalidArgument,
            format!("address '{address}' is not of the form SCHEME:rest"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_scheme_and_rest() {
        let parsed = parse_address("TCP:0.0.0.0:42000").unwrap();
        assert_eq!(parsed.scheme, "TCP");
        assert_eq!(parsed.rest, "0.0.0.0:42000");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(parse_address("no-colon-here").is_err());
        assert!(parse_address(":rest").is_err());
    }
}
