//! Integration tests: the full repricing pipeline against in-memory fakes.

mod fakes;
mod pipeline;
