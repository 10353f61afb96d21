pub mod annotation;
pub mod errors;

pub use annotation::{
    Annotation, AnnotatorConfig, FieldRegistry, PolicyConfig, PosMatchType, Properties,
    RegexNerAnnotator, Token,
};
pub use errors::{RegexNerError, Result};
