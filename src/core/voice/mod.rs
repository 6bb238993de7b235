//! Voice catalog and voice resolution.

pub mod catalog;
pub mod resolver;

pub use catalog::{CatalogError, MULTI_LOCALE_BUCKET, VoiceCatalog, VoiceEntry};
pub use resolver::{DEFAULT_LOCALE, VoiceError, normalize_locale, resolve};
