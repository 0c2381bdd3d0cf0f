pub mod crate_record;
