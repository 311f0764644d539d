pub mod functions;
pub mod impl_traits;
pub mod raw_xml;
