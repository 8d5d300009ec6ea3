pub mod check;
pub mod convert;
pub mod setup;
pub mod summary;
pub mod ui;
