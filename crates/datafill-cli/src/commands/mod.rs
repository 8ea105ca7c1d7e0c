mod check;
mod generate;
mod parse;
mod preview;

pub use check::{CheckArgs, run_check};
pub use generate::{GenerateArgs, run_generate};
pub use parse::{ParseArgs, run_parse};
pub use preview::{PreviewArgs, run_preview};
