pub mod format_url_path;
