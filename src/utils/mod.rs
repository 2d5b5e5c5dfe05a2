//! Small shared building blocks: HTTP errors and validated identity newtypes.
pub mod email;
pub mod httperror;
pub mod phone;
