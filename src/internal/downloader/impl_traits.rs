pub mod impl_probe;
pub mod impl_status_decoder;
pub mod impl_writer_at;
