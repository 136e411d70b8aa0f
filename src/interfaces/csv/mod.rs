pub mod event_reader;
pub mod product_reader;
pub mod report_writer;
