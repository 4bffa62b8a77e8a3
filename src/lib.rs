// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod docker_repo;
pub mod engine;
pub mod gate;
pub mod models;
pub mod runtime;
pub mod supervisor;
pub mod ui;
pub mod version;
