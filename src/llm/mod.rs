//! Code synthesis through a completion provider

pub mod client;

pub use client::{CodeSynthesizer, SynthesisClient, SynthesisRequest};
