pub mod coder;
