pub mod batch;
pub mod business;
pub mod proxy;
pub mod search;
