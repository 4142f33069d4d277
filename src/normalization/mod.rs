pub mod code;
pub mod date;
pub mod fields;
