//! Face identification module
//!
//! Gallery storage, frame acquisition, embedding, and the identification
//! loop. Embedding computation is delegated to a hosted face service; only
//! the matching semantics live here.

mod camera;
mod encoder;
mod enroll;
mod gallery;
mod identify;

pub use camera::{FrameSource, HttpFrameSource};
pub use encoder::{FaceEncoder, HttpFaceEncoder};
pub use enroll::enroll_directory;
pub use gallery::{distance, FaceGallery, GalleryEntry};
pub use identify::{FaceIdentifier, IdentifyFace};
