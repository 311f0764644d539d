pub mod dav_error;
