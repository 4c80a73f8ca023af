/*!
# Language Module

This module provides lexical analysis of program text: the word
tokenizer and the error type shared by every stage of the pipeline.

*/

#[macro_use]
mod error;
mod scan;

pub use error::Error;
pub use error::ErrorCode;
pub use scan::scan;
pub use scan::Tokens;
