// ⚖️ Merge Engine - Reconcile two partial views of the same records
//
// Given two position-aligned series of the same record type:
//   - identifiers must match pairwise, otherwise the whole merge fails
//   - identifiers in the drop set are skipped (known-corrupt upstream rows)
//   - every other pair becomes one record: first source wins, second fills gaps

use crate::records::{HousePriceRecord, HouseRecord, Record};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// Aligned records disagree on identity
    #[error("{entity} ids do not match at position {position}: {first} != {second}")]
    IdentifierMismatch {
        entity: &'static str,
        position: usize,
        first: i64,
        second: i64,
    },

    /// Two records of different shapes were asked to merge
    #[error("cannot merge a {first} record with a {second} record")]
    RecordTypeMismatch {
        first: &'static str,
        second: &'static str,
    },
}

// ============================================================================
// MERGE REPORT
// ============================================================================

/// Outcome of one merge run
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport<R> {
    /// Merged records, in input order
    pub records: Vec<R>,

    /// Drop-set identifiers actually encountered (and skipped)
    pub dropped: Vec<i64>,

    /// Records left over in the longer series (never merged)
    pub unpaired: usize,
}

impl<R: Record> MergeReport<R> {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} merged, {} dropped {:?}, {} unpaired",
            R::ENTITY,
            self.records.len(),
            self.dropped.len(),
            self.dropped,
            self.unpaired
        )
    }
}

// ============================================================================
// MERGE ENGINE
// ============================================================================

pub struct MergeEngine {
    /// Identifiers excluded from every merge
    pub drop_set: BTreeSet<i64>,
}

impl MergeEngine {
    pub fn new() -> Self {
        MergeEngine {
            drop_set: BTreeSet::new(),
        }
    }

    pub fn with_drop_set(drop_set: BTreeSet<i64>) -> Self {
        MergeEngine { drop_set }
    }

    /// Merge two aligned series into one.
    ///
    /// Pairs are taken by position. When the series differ in length the
    /// extra tail of the longer one is ignored and reported as `unpaired`.
    ///
    /// Example:
    /// ```
    /// use housing_etl::{HousePriceRecord, MergeEngine};
    ///
    /// let engine = MergeEngine::new();
    /// let areas = vec![HousePriceRecord::new(0).with_area(1200)];
    /// let prices = vec![HousePriceRecord::new(0).with_price(90_000)];
    ///
    /// let report = engine.merge(areas, prices).unwrap();
    /// assert_eq!(report.records[0].area, Some(1200));
    /// assert_eq!(report.records[0].price, Some(90_000));
    /// ```
    pub fn merge<R: Record>(
        &self,
        first: Vec<R>,
        second: Vec<R>,
    ) -> Result<MergeReport<R>, MergeError> {
        let unpaired = first.len().abs_diff(second.len());
        if unpaired > 0 {
            warn!(
                entity = R::ENTITY,
                first = first.len(),
                second = second.len(),
                "series lengths differ, ignoring unpaired tail"
            );
        }

        let mut records = Vec::with_capacity(first.len().min(second.len()));
        let mut dropped = Vec::new();

        for (position, (a, b)) in first.into_iter().zip(second).enumerate() {
            if a.house_id() != b.house_id() {
                return Err(MergeError::IdentifierMismatch {
                    entity: R::ENTITY,
                    position,
                    first: a.house_id(),
                    second: b.house_id(),
                });
            }

            if self.drop_set.contains(&a.house_id()) {
                debug!(entity = R::ENTITY, house_id = a.house_id(), "dropping broken row");
                dropped.push(a.house_id());
                continue;
            }

            records.push(a.merge_with(b));
        }

        Ok(MergeReport {
            records,
            dropped,
            unpaired,
        })
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge two aligned series, skipping identifiers in `drop_set`
pub fn merge_records<R: Record>(
    first: Vec<R>,
    second: Vec<R>,
    drop_set: &BTreeSet<i64>,
) -> Result<Vec<R>, MergeError> {
    let engine = MergeEngine::with_drop_set(drop_set.clone());
    Ok(engine.merge(first, second)?.records)
}

// ============================================================================
// DYNAMIC RECORDS
// ============================================================================

/// AnyRecord - a record whose shape is only known at runtime
///
/// The runtime-typed merge path, for callers holding records of either
/// entity in one collection. Typed series go through `MergeEngine`, where
/// mixing shapes cannot compile; here it is `RecordTypeMismatch`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyRecord {
    House(HouseRecord),
    HousePrice(HousePriceRecord),
}

impl AnyRecord {
    pub fn entity(&self) -> &'static str {
        match self {
            AnyRecord::House(_) => HouseRecord::ENTITY,
            AnyRecord::HousePrice(_) => HousePriceRecord::ENTITY,
        }
    }

    pub fn house_id(&self) -> i64 {
        match self {
            AnyRecord::House(r) => r.house_id,
            AnyRecord::HousePrice(r) => r.house_id,
        }
    }

    /// Merge two records of the same shape; differing shapes are an error
    pub fn merge(self, other: AnyRecord) -> Result<AnyRecord, MergeError> {
        match (self, other) {
            (AnyRecord::House(a), AnyRecord::House(b)) => Ok(AnyRecord::House(a.merge_with(b))),
            (AnyRecord::HousePrice(a), AnyRecord::HousePrice(b)) => {
                Ok(AnyRecord::HousePrice(a.merge_with(b)))
            }
            (a, b) => Err(MergeError::RecordTypeMismatch {
                first: a.entity(),
                second: b.entity(),
            }),
        }
    }
}

impl From<HouseRecord> for AnyRecord {
    fn from(record: HouseRecord) -> Self {
        AnyRecord::House(record)
    }
}

impl From<HousePriceRecord> for AnyRecord {
    fn from(record: HousePriceRecord) -> Self {
        AnyRecord::HousePrice(record)
    }
}

// ============================================================================
// TESTS
// ============================================================================
