use serde::{Deserialize, Serialize};

/// 对应 WebDAV 错误响应体的 `<d:error>` 节点
///
/// ```xml
/// <d:error xmlns:d="DAV:" xmlns:s="http://sabredav.org/ns">
///   <s:exception>Sabre\DAV\Exception\NotFound</s:exception>
///   <s:message>File not found</s:message>
/// </d:error>
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename = "error")]
pub struct DavError {
    /// `<s:exception>`：服务端异常类名
    #[serde(default)]
    pub exception: Option<String>,
    /// `<s:message>`：给人看的错误说明
    #[serde(default)]
    pub message: Option<String>,
}

impl DavError {
    /// 解析失败或两个字段都为空时返回 `None`
    pub fn parse(body: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(body);
        let error: DavError = quick_xml::de::from_str(text.trim()).ok()?;
        if error.exception.is_none() && error.message.is_none() {
            return None;
        }
        Some(error)
    }
}
