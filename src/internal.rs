pub mod auth;
pub mod downloader;
pub mod entrance;
pub mod states;
pub mod webdav;
