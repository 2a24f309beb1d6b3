//! Read-only invariant auditor.

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use shopstack_core::{Page, Pagination, SkuId, StockResult};

use crate::record::StockRecord;
use crate::store::StockStore;

/// What a flagged record violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// `total != available + reserved`.
    QuantityMismatch,
    /// At least one quantity is negative.
    NegativeQuantity,
    /// `critical_threshold > warning_threshold`.
    ThresholdInversion,
}

/// One flagged record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub sku_id: SkuId,
    pub issue: IssueKind,
    pub detail: String,
    pub suggested_action: String,
}

/// Result of a full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub records_checked: u64,
    pub issues: Vec<ConsistencyIssue>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Evaluate one record. Pure; shared by the scanning checker and tests.
pub fn check_record(record: &StockRecord) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if record.total != record.available + record.reserved {
        issues.push(ConsistencyIssue {
            sku_id: record.sku_id.clone(),
            issue: IssueKind::QuantityMismatch,
            detail: format!(
                "total {} != available {} + reserved {}",
                record.total, record.available, record.reserved
            ),
            suggested_action: "recount physical stock and correct via a set-adjustment"
                .to_string(),
        });
    }

    if record.total < 0 || record.available < 0 || record.reserved < 0 {
        issues.push(ConsistencyIssue {
            sku_id: record.sku_id.clone(),
            issue: IssueKind::NegativeQuantity,
            detail: format!(
                "total {}, available {}, reserved {}",
                record.total, record.available, record.reserved
            ),
            suggested_action: "inspect recent ledger entries for the offending mutation"
                .to_string(),
        });
    }

    if record.critical_threshold > record.warning_threshold {
        issues.push(ConsistencyIssue {
            sku_id: record.sku_id.clone(),
            issue: IssueKind::ThresholdInversion,
            detail: format!(
                "critical_threshold {} > warning_threshold {}",
                record.critical_threshold, record.warning_threshold
            ),
            suggested_action: "update thresholds so critical <= warning".to_string(),
        });
    }

    issues
}

/// Scans all active stock records for invariant violations.
///
/// Diagnostics only: never mutates state, never locks rows, and uses snapshot
/// reads — a record mid-mutation by a concurrent writer is not a violation.
/// Intended for scheduled runs, not inline enforcement.
#[derive(Debug)]
pub struct ConsistencyChecker<S> {
    store: S,
}

impl<S> ConsistencyChecker<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Scan every active record and report violations.
    #[instrument(skip(self), err)]
    pub fn check_all(&self) -> StockResult<ConsistencyReport> {
        let mut report = ConsistencyReport::default();
        let mut pagination = Pagination {
            limit: 200,
            offset: 0,
        };

        loop {
            let page: Page<StockRecord> = self.store.scan_stock(pagination)?;
            for record in &page.items {
                if !record.active {
                    continue;
                }
                report.records_checked += 1;
                report.issues.extend(check_record(record));
            }
            if !page.has_more {
                break;
            }
            pagination.offset += pagination.limit;
        }

        if !report.is_clean() {
            warn!(
                checked = report.records_checked,
                issues = report.issues.len(),
                "consistency violations found"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> StockRecord {
        let now = Utc::now();
        StockRecord {
            sku_id: SkuId::new("SKU-C").unwrap(),
            total: 100,
            available: 70,
            reserved: 30,
            warning_threshold: 10,
            critical_threshold: 5,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn clean_record_produces_no_issues() {
        assert!(check_record(&record()).is_empty());
    }

    #[test]
    fn broken_equation_is_flagged() {
        let mut r = record();
        r.available = 60;
        let issues = check_record(&r);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue, IssueKind::QuantityMismatch);
    }

    #[test]
    fn negative_quantity_is_flagged_alongside_the_mismatch() {
        let mut r = record();
        r.available = -5;
        r.total = 25;
        let kinds: Vec<IssueKind> = check_record(&r).iter().map(|i| i.issue).collect();
        assert!(kinds.contains(&IssueKind::NegativeQuantity));
    }

    #[test]
    fn inverted_thresholds_are_flagged() {
        let mut r = record();
        r.warning_threshold = 5;
        r.critical_threshold = 10;
        let issues = check_record(&r);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue, IssueKind::ThresholdInversion);
    }

    #[test]
    fn one_record_can_carry_multiple_issues() {
        let mut r = record();
        r.available = -5;       // mismatch + negative
        r.critical_threshold = 99; // inversion
        assert_eq!(check_record(&r).len(), 3);
    }
}
