//! # Batch Data Model and Accumulation
//!
//! `Reading` is one timestamped sample of the synthetic signal. The
//! `Batcher` accumulates readings into a fixed-capacity `Batch` on the
//! producer's timeline and freezes it atomically the instant it reaches
//! capacity; the frozen batch is owned exclusively by one pipeline run until
//! result assembly produces a `BatchResult`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One timestamped scalar sample of the synthetic signal
///
/// Immutable once created; produced by the signal generator and consumed
/// only by the batcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A fixed-size, order-preserving group of readings processed as one unit
///
/// A batch handed to the dispatcher is always exactly at capacity and never
/// mutated afterward; the batcher swaps in fresh backing storage on freeze
/// rather than retaining the dispatched vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Identity assigned at freeze time; carried through logs and failure
    /// notifications
    pub batch_id: Uuid,
    readings: Vec<Reading>,
}

impl Batch {
    fn new(readings: Vec<Reading>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            readings,
        }
    }

    /// Readings in arrival order
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// First reading in arrival order
    pub fn first(&self) -> Option<&Reading> {
        self.readings.first()
    }

    /// Last reading in arrival order
    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }
}

/// Summary statistics derived from one batch
///
/// Derived, immutable, produced once per batch by the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub batch_size: usize,
    pub first_value: f64,
    pub first_timestamp: DateTime<Utc>,
    pub last_value: f64,
    pub last_timestamp: DateTime<Utc>,
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub std_dev: f64,
}

/// Single-producer batch accumulator
///
/// `append` runs on the same logical timeline as the generator; there are no
/// concurrent appenders. The in-progress batch is exclusively owned here
/// until frozen.
#[derive(Debug)]
pub struct Batcher {
    capacity: usize,
    in_progress: Vec<Reading>,
}

impl Batcher {
    /// Create a batcher with the given batch capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-capacity batch can never freeze.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "batch capacity must be greater than 0");
        Self {
            capacity,
            in_progress: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of readings in the in-progress batch
    pub fn pending(&self) -> usize {
        self.in_progress.len()
    }

    /// Append one reading; returns the frozen batch on the append that
    /// reaches capacity, `None` otherwise
    pub fn append(&mut self, reading: Reading) -> Option<Batch> {
        self.in_progress.push(reading);

        if self.in_progress.len() == self.capacity {
            let full = std::mem::replace(&mut self.in_progress, Vec::with_capacity(self.capacity));
            Some(Batch::new(full))
        } else {
            None
        }
    }

    /// Take the pending partial batch, leaving the batcher empty
    ///
    /// Used at shutdown so the coordinator can decide whether to discard or
    /// flush readings that never reached capacity. Returns `None` when no
    /// readings are pending.
    pub fn take_partial(&mut self) -> Option<Batch> {
        if self.in_progress.is_empty() {
            return None;
        }
        let partial = std::mem::replace(&mut self.in_progress, Vec::with_capacity(self.capacity));
        Some(Batch::new(partial))
    }
}
