//! # nexback-trainer
//!
//! Terminal front end for the dual n-back engine: real-time trial
//! scheduling, keyboard responses, board rendering and on-disk session
//! storage. All game logic lives in `nexback-engine`; this crate only
//! supplies the clock, the keyboard and the persistence.

pub mod config;
pub mod logging;
pub mod presentation;
pub mod runner;
pub mod storage;
