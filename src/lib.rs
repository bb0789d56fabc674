//! APB Traffic Library
//!
//! Grid traffic and pursuit simulation for the city driving mini-game. Runs
//! headless; rendering and input live with the host.

pub mod simulation;
