pub mod insight;
pub mod storage;
