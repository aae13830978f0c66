//! Image and sequence processing for CAPTCHA recognition.
//!
//! # Modules
//!
//! * `decode` - Softmax and logit decoding into text
//! * `normalization` - Pixel normalization into CHW tensors
//! * `preprocess` - The full image to tensor transform
//! * `resize` - Fixed-size stretch resizing
//! * `tokenizer` - Charset, token layout and probability decoding

mod decode;
mod normalization;
mod preprocess;
mod resize;
pub mod tokenizer;

pub use decode::*;
pub use normalization::*;
pub use preprocess::*;
pub use resize::*;
pub use tokenizer::{Charset, ConfidenceReduction, DecodedText, END_TOKEN, Tokenizer};
