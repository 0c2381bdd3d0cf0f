pub mod crates;
