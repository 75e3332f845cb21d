//! Application services.

pub mod offline_books;
