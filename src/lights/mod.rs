pub mod board;
pub mod controller;
pub mod protocol;
