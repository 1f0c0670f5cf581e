pub mod analysis;
pub mod decode;
pub mod envelope;
pub mod features;
pub mod note;
pub mod pitch;
pub mod source;
