//! Article, image, social post and video generation on top of the Gemini API.

pub mod config;
pub mod db;
pub mod error;
pub mod gemini;
pub mod model;
pub mod orchestrator;
pub mod poller;
pub mod prompts;
pub mod session;
pub mod social;
