pub mod captions;
pub mod keys;
pub mod ui;
