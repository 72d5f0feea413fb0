pub mod collate;
pub mod rebuild;
pub mod search;
