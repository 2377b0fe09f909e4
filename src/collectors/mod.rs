pub mod bandwidth;
pub mod bench_cache;
pub mod cpu;
pub mod mem;
pub mod mounts;
pub mod os;
pub mod route;
pub mod sensors;
pub mod storage;
pub mod topology;
