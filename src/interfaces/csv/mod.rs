pub mod account_writer;
pub mod op_reader;
