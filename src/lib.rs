#![warn(clippy::pedantic)]
// Noisy doc/signature lints — would require annotating most pub functions
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference — keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Module structure — lms::LmsClient / media::MediaClient pattern by design
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod event;
pub mod gateway;
pub mod ingest;
pub mod lms;
pub mod media;
pub mod reply;
pub mod router;
pub(crate) mod utils;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
