//! Object allocation and mutation workload.
//!
//! A batch of [`Record`]s is built once, mutated in a single pass (aging then weight
//! increment, chained on the same record) and rendered line by line in a second pass.

use std::fmt;
use std::io::Write;

use tracing::{debug, trace};

/// Batch size used by the reference benchmark invocation.
pub const REFERENCE_BATCH_SIZE: usize = 10_000;

/// Age every record is raised to by [`Record::age_to_hundred`].
pub const TARGET_AGE: i64 = 100;

const BASE_WEIGHT: f64 = 80_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: i64,
    pub age: i64,
    pub weight: f64,
}

impl Record {
    pub fn new(id: i64, age: i64, weight: f64) -> Self {
        Self { id, age, weight }
    }

    /// Record seeded the way batch construction does: `age = 100 - id`, `weight = 80000 - id`.
    pub fn seeded(id: i64) -> Self {
        Self::new(id, TARGET_AGE - id, BASE_WEIGHT - id as f64)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Steps `age` up one year at a time until it reaches 100. Never lowers it.
    ///
    /// The stepping loop is the measured workload; the observable result is
    /// `max(age, 100)`.
    pub fn age_to_hundred(&mut self) -> &mut Self {
        while self.age < TARGET_AGE {
            self.age += 1;
        }
        self
    }

    pub fn increment_weight(&mut self, amount: f64) -> &mut Self {
        self.weight += amount;
        self
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Person {} - Age: {}, Weight: {}", self.id, self.age, self.weight)
    }
}

/// Ordered, exclusively owned collection of records.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    records: Vec<Record>,
}

impl RecordBatch {
    /// Builds `size` records with ids `1..=size` in ascending order.
    pub fn build(size: usize) -> Self {
        let records: Vec<Record> = (1..=size as i64).map(Record::seeded).collect();
        trace!(size = records.len(), "record batch built");
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Pass 1: age then add the record's own id to its weight, in insertion order.
    pub fn transform(&mut self) {
        for record in &mut self.records {
            let id = record.id as f64;
            record.age_to_hundred().increment_weight(id);
        }
        trace!(size = self.records.len(), "record batch transformed");
    }

    /// Pass 2: one rendered line per record, in insertion order.
    pub fn write_rendered<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        for record in &self.records {
            writeln!(out, "{}", record)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RecordBatch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Build, transform and render a batch of `size` records into `out`.
pub fn run_batch<W: Write + ?Sized>(out: &mut W, size: usize) -> std::io::Result<RecordBatch> {
    let mut batch = RecordBatch::build(size);
    batch.transform();
    batch.write_rendered(out)?;
    debug!(size, "record batch rendered");
    Ok(batch)
}
