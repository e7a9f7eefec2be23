pub mod channels;
pub mod smf;
