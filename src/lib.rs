// Library for tests to access modules

pub mod bucket_filler;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod refresh_worker;
pub mod routes;
pub mod sample_repo;
pub mod service;
pub mod version;
