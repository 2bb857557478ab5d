pub mod split;
pub mod words;
