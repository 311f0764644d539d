use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use sha2::{Digest, Sha256};
use url::Url;

/// 默认连接超时
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 认证结构体
///
/// 该结构体定位
/// - 保存 WebDAV 基础认证信息（base_url + 带 Basic 认证头的 HTTP 客户端）
/// - 为下载器提供已认证的 [`Client`]，下载器本身不关心认证方式
///
/// 默认Eq时会匹配base_url和token，如果需要单独比较token，需使用eq_only_token方法
#[derive(Clone)]
pub struct WebdavAuth {
    pub client: Client,     // 内部是Arc，不需要特殊处理
    pub base_url: Arc<Url>, // 下载任务会跨线程使用，所以是 Arc
    pub(crate) encrypted_token: Arc<String>, // 只保留摘要，不保留明文
}

impl WebdavAuth {
    /// 创建新的认证结构体
    pub fn new(username: &str, password: &str, base_url: &str) -> Result<Self, String> {
        let http_client = InternalHttpClient::create(username, password)?;
        let base_url = format_base_url(base_url)?;

        Ok(Self {
            client: http_client.client,
            base_url: Arc::new(base_url),
            encrypted_token: Arc::new(http_client.encrypted_token),
        })
    }

    /// 仅比较token是否相等
    pub fn eq_only_token(&self, other: &Self) -> bool {
        self.encrypted_token == other.encrypted_token
    }
}

impl PartialEq for WebdavAuth {
    fn eq(&self, other: &Self) -> bool {
        self.encrypted_token == other.encrypted_token && self.base_url == other.base_url
    }
}

/// 防止debug泄漏账号
impl fmt::Debug for WebdavAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebdavAuth")
            .field("base_url", &self.base_url.as_str())
            .field("client", &"<Client with hidden authorization>")
            .finish()
    }
}

/// base_url 统一以 `/` 结尾，否则 `Url::join` 会吃掉最后一段路径
pub(crate) fn format_base_url(url: &str) -> Result<Url, String> {
    if url.is_empty() {
        return Err("路径为空".to_string());
    }

    let mut base_url = Url::parse(url).map_err(|e| e.to_string())?;

    if !base_url.path().ends_with('/') {
        let new_path = format!("{}/", base_url.path());
        base_url.set_path(&new_path);
    }

    Ok(base_url)
}

/// 初始化 WebdavAuth 时使用的临时结构
struct InternalHttpClient {
    client: Client,
    encrypted_token: String,
}

impl InternalHttpClient {
    fn digest(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn create(username: &str, password: &str) -> Result<Self, String> {
        let mut headers = HeaderMap::new();

        let token =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));

        let mut auth_value =
            HeaderValue::from_str(&format!("Basic {}", token)).map_err(|e| e.to_string())?;
        auth_value.set_sensitive(true);

        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("webdav_transfer/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .http1_only()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            client,
            encrypted_token: Self::digest(&token),
        })
    }
}
