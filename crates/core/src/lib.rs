// Core types - the section/variant model shared by display and export

pub mod country;
pub mod format;
pub mod markdown;
pub mod media;
pub mod normalize;
pub mod payload;
pub mod scalar;
pub mod section;
pub mod tag;
pub mod validate;
pub mod variant;

pub use format::ValueFormatter;
pub use payload::{classify_payload, payload_sections, PayloadShape};
pub use scalar::Scalar;
pub use section::{Section, SectionBody, SectionType};
pub use tag::Tag;
pub use validate::{validate, validate_tag, Schema, Shape};
pub use variant::Variant;
