//! WebDAV 协作层：路径拼接、DAV 错误体解析。

use reqwest::{StatusCode, Url};

use crate::downloader::{DownloadError, StatusDecoder};
use crate::webdav::functions::format_url_path;
use crate::webdav::impl_traits::DavStatusDecoder;
use crate::webdav::structs::DavError;

const NOT_FOUND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:error xmlns:d="DAV:" xmlns:s="http://sabredav.org/ns">
  <s:exception>Sabre\DAV\Exception\NotFound</s:exception>
  <s:message>File with name t2/a1.txt could not be located</s:message>
</d:error>"#;

fn base() -> Url {
    Url::parse("http://localhost:8080/dav/").unwrap()
}

#[test]
fn joins_and_encodes_segments() {
    let url = format_url_path(&base(), "./docs/a b#1.txt").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/dav/docs/a%20b%231.txt");

    let url = format_url_path(&base(), "t1/").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/dav/t1/");

    let url = format_url_path(&base(), "中文.txt").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/dav/%E4%B8%AD%E6%96%87.txt");
}

#[test]
fn colon_segment_is_not_a_scheme() {
    let url = format_url_path(&base(), "a:b.txt").unwrap();
    assert_eq!(url.host_str(), Some("localhost"));
    assert!(url.path().starts_with("/dav/"));
}

#[test]
fn rejects_escapes() {
    assert!(format_url_path(&base(), "../etc/passwd").is_err());
    assert!(format_url_path(&base(), "a/../../b").is_err());
    assert!(format_url_path(&base(), "").is_err());
    assert!(format_url_path(&base(), "./").is_err());
}

#[test]
fn leading_slash_stays_under_base() {
    let url = format_url_path(&base(), "/a.txt").unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/dav/a.txt");
}

#[test]
fn parses_sabre_error() {
    let error = DavError::parse(NOT_FOUND_BODY.as_bytes()).unwrap();
    assert_eq!(error.exception.as_deref(), Some(r"Sabre\DAV\Exception\NotFound"));
    assert_eq!(
        error.message.as_deref(),
        Some("File with name t2/a1.txt could not be located")
    );
}

#[test]
fn non_dav_bodies_are_not_decoded() {
    assert_eq!(DavError::parse(b"plain text"), None);
    assert_eq!(DavError::parse(b"<html><body>oops</body></html>"), None);
    assert_eq!(DavError::parse(b""), None);
}

#[test]
fn dav_decoder_builds_remote_error() {
    let error = DavStatusDecoder
        .decode(StatusCode::NOT_FOUND, NOT_FOUND_BODY.as_bytes())
        .unwrap();
    match error {
        DownloadError::Remote { status, code, message } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(code, r"Sabre\DAV\Exception\NotFound");
            assert!(message.contains("could not be located"));
        }
        other => panic!("预期 Remote，得到 {:?}", other),
    }
    assert!(DavStatusDecoder.decode(StatusCode::NOT_FOUND, b"nope").is_none());
}
