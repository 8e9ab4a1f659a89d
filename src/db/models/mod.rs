pub mod document;

pub use document::DocumentRow;
