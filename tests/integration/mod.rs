//! Integration tests against on-disk stores and scripted or mocked servers

pub mod http_api;
pub mod offline_scenarios;
pub mod restart_test;
