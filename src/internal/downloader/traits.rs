pub mod probe;
pub mod status_decoder;
pub mod writer_at;
