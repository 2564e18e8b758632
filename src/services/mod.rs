pub mod booking;
pub mod catalog;
pub mod checkout;
pub mod export;
pub mod sessions;
pub mod storage;
