// src/cfg/mod.rs

pub mod config;
