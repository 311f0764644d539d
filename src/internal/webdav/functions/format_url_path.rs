use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Url;

/// 路径段里需要转义的字符，`/` 也要转义，避免文件名被拆成多级目录
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 把相对路径拼到 base_url 后面，逐段做百分号编码。
///
/// - `..` 一律拒绝，拼接结果也必须仍在 base_url 之下；
/// - 空段与 `.` 会被忽略，以 `/` 结尾的路径保留结尾的 `/`。
///
/// example:
/// ```ignore
/// let base = Url::parse("http://localhost:8080/dav/").unwrap();
/// let url = format_url_path(&base, "./docs/a b.txt").unwrap();
/// assert_eq!(url.as_str(), "http://localhost:8080/dav/docs/a%20b.txt");
/// ```
pub fn format_url_path(base_url: &Url, path: &str) -> Result<Url, String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err("父目录不允许".to_string()),
            segment => segments.push(utf8_percent_encode(segment, PATH_SEGMENT).to_string()),
        }
    }
    if segments.is_empty() {
        return Err("路径为空".to_string());
    }

    // 带上 ./ 前缀，避免 "a:b" 之类的段被当成 scheme
    let mut relative = format!("./{}", segments.join("/"));
    if path.ends_with('/') {
        relative.push('/');
    }
    let joined_url = base_url
        .join(&relative)
        .map_err(|_| "路径格式错误".to_string())?;

    if joined_url.scheme() != base_url.scheme()
        || joined_url.host_str() != base_url.host_str()
        || joined_url.port_or_known_default() != base_url.port_or_known_default()
        || !joined_url.path().starts_with(base_url.path())
    {
        return Err("父目录不允许".to_string());
    }

    Ok(joined_url)
}
