pub mod net;
pub mod storage;
pub mod system;
