#![allow(dead_code)]

pub mod bobrik_env;
pub mod http;
