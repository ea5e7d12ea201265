//! Order Assist: chat-driven food ordering for a single store.

pub mod address;
pub mod cart;
pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod llm;
pub mod notifications;
pub mod safety;
pub mod validation;
pub mod voice;
