pub mod impl_status_decoder;
