pub mod controller;
pub mod db;
pub mod diet;
pub mod filters;
pub mod import;
pub mod models;
pub mod normalize;
pub mod seed;
pub mod service;
pub mod storage;
pub mod stores;
