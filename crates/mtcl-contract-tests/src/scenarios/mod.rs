pub mod broadcast;
pub mod echo;
pub mod fan_in;
pub mod fan_out;
pub mod gather;
