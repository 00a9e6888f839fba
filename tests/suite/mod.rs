mod config;
mod determinism;
mod limits;
mod scenarios;
