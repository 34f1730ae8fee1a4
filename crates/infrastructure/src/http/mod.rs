//! HTTP infrastructure utilities.

mod multipart;

pub use multipart::build_form;
