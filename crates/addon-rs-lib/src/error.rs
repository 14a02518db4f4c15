//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

use crate::relationship_resolver::{CycleDetectedError, GraphError};
use crate::installer::{QueueError, RequestError, ValidationError};

#[derive(Debug, Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("regex error: {0}")]
	Regex(#[from] regex::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("dependency graph error: {0}")]
	Graph(#[from] GraphError),
	#[error("{0}")]
	Cycle(#[from] CycleDetectedError),
	#[error("validation error: {0}")]
	Validation(#[from] ValidationError),
	#[error("request error: {0}")]
	Request(#[from] RequestError),
	#[error("queue error: {0}")]
	Queue(#[from] QueueError),
}
