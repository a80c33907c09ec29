pub mod decode;
pub mod tags;
