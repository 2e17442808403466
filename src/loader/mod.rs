pub mod idx;
pub mod weights;

pub use idx::{DatasetShape, decode_images, decode_labels, read_images, read_labels};
pub use weights::load_model;
