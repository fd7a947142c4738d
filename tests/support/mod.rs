#![allow(dead_code)]

pub mod env;
pub mod fake_services;
