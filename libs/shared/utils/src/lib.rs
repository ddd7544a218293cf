pub mod extractor;
pub mod signing;
pub mod test_utils;
