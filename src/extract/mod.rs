//! Content extraction and validation (spec §4.10): turns rendered HTML into
//! a [`crate::domain::FetchResult`] with a title, body text, markdown,
//! tables and links, plus a [`crate::domain::DecisionTrace`] fragment
//! recording every attempt. [`validator`] then judges whether the result is
//! trustworthy enough to return, worth retrying on a pricier tier, or
//! fatally broken.

pub mod extractor;
pub mod links;
pub mod markdown;
pub mod tables;
pub mod title;
pub mod validator;

pub use extractor::extract;
pub use links::extract_links;
pub use markdown::html_to_markdown;
pub use tables::extract_tables;
pub use title::extract_title;
pub use validator::{validate, ValidationOutcome};
