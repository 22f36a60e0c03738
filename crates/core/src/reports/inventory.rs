//! Medication stock reports.

use super::{decode_rows, params};
use crate::constants::{HOSPITALS, MEDICATIONS};
use crate::engine::{Accumulator, Engine, Expr, Pipeline, Predicate, SortKey};
use crate::ReportResult;
use medrep_types::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InventoryTotalsRow {
    pub hospital: EntityId,
    pub total_units: i64,
    pub medication_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LowStockRow {
    pub medication: String,
    pub hospital: String,
    pub current_stock: i64,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TurnoverRow {
    pub hospital: String,
    pub medication_count: i64,
    pub total_stock: i64,
    pub average_stock: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunoutRow {
    pub medication: String,
    pub hospital: String,
    pub current_stock: i64,
    pub days_remaining: Decimal,
}

const STOCK: &str = "stock_by_hospital";
const STOCK_HOSPITAL: &str = "stock_by_hospital.hospital_id";
const STOCK_QUANTITY: &str = "stock_by_hospital.quantity";

/// One record per (medication, hospital) stock entry, with the hospital document joined in.
fn stock_entries_with_hospital() -> Pipeline {
    Pipeline::new()
        .unwind(STOCK)
        .lookup(HOSPITALS, STOCK_HOSPITAL, "_id", "hospital")
        .unwind("hospital")
}

/// Total units held by one hospital across all medications.
///
/// A hospital with no stock entries yields no row.
pub fn inventory_totals(
    engine: &Engine<'_>,
    hospital_id: EntityId,
) -> ReportResult<Vec<InventoryTotalsRow>> {
    let pipeline = Pipeline::new()
        .unwind(STOCK)
        .filter(Predicate::eq(STOCK_HOSPITAL, hospital_id))
        .group(
            Expr::null(),
            [
                ("totalUnits", Accumulator::Sum(Expr::field(STOCK_QUANTITY))),
                ("medicationCount", Accumulator::Count),
            ],
        )
        .project([
            ("hospital", Expr::lit(hospital_id)),
            ("totalUnits", Expr::field("totalUnits")),
            ("medicationCount", Expr::field("medicationCount")),
        ]);

    decode_rows(&engine.aggregate(MEDICATIONS, &pipeline)?)
}

/// Stock entries below `threshold` units, in collection order.
pub fn low_stock_alerts(engine: &Engine<'_>, threshold: i64) -> ReportResult<Vec<LowStockRow>> {
    let threshold = params::non_negative("stock threshold", threshold)?;

    let pipeline = Pipeline::new()
        .unwind(STOCK)
        .filter(Predicate::lt(STOCK_QUANTITY, threshold))
        .lookup(HOSPITALS, STOCK_HOSPITAL, "_id", "hospital")
        .unwind("hospital")
        .project([
            ("medication", Expr::field("name")),
            ("hospital", Expr::field("hospital.name")),
            ("currentStock", Expr::field(STOCK_QUANTITY)),
            ("threshold", Expr::lit(threshold)),
        ]);

    decode_rows(&engine.aggregate(MEDICATIONS, &pipeline)?)
}

/// Medication count and stock level per hospital, highest total stock first.
pub fn medication_turnover(engine: &Engine<'_>) -> ReportResult<Vec<TurnoverRow>> {
    let pipeline = stock_entries_with_hospital()
        .group(
            Expr::field("hospital.name"),
            [
                ("medicationCount", Accumulator::Count),
                ("totalStock", Accumulator::Sum(Expr::field(STOCK_QUANTITY))),
                ("averageStock", Accumulator::Avg(Expr::field(STOCK_QUANTITY))),
            ],
        )
        .project([
            ("hospital", Expr::field("_id")),
            ("medicationCount", Expr::field("medicationCount")),
            ("totalStock", Expr::field("totalStock")),
            ("averageStock", Expr::round(Expr::field("averageStock"), 2)),
        ])
        .sort([SortKey::desc("totalStock"), SortKey::asc("hospital")]);

    decode_rows(&engine.aggregate(MEDICATIONS, &pipeline)?)
}

/// Stock entries that run out in fewer than `desired_days` at `daily_consumption` units a
/// day, soonest first.
pub fn stock_runout_projection(
    engine: &Engine<'_>,
    desired_days: i64,
    daily_consumption: i64,
) -> ReportResult<Vec<RunoutRow>> {
    let desired_days = params::non_negative("desired days", desired_days)?;
    let daily_consumption = params::positive("daily consumption", daily_consumption)?;

    let pipeline = stock_entries_with_hospital()
        .project([
            ("medication", Expr::field("name")),
            ("hospital", Expr::field("hospital.name")),
            ("currentStock", Expr::field(STOCK_QUANTITY)),
            (
                "daysRemaining",
                Expr::round(
                    Expr::divide(Expr::field(STOCK_QUANTITY), Expr::lit(daily_consumption)),
                    0,
                ),
            ),
        ])
        .filter(Predicate::lt("daysRemaining", desired_days))
        .sort([
            SortKey::asc("daysRemaining"),
            SortKey::asc("medication"),
            SortKey::asc("hospital"),
        ]);

    decode_rows(&engine.aggregate(MEDICATIONS, &pipeline)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::RoleTable;
    use crate::constants::DEFAULT_DAILY_CONSUMPTION;
    use crate::fixtures::{self, CENTRAL, SOUTH};
    use crate::record::Record;
    use crate::store::MemoryStore;
    use crate::ReportError;

    #[test]
    fn inventory_totals_for_one_hospital() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = inventory_totals(&engine, CENTRAL).expect("inventory");
        assert_eq!(
            rows,
            vec![InventoryTotalsRow {
                hospital: CENTRAL,
                total_units: 1700,
                medication_count: 2,
            }]
        );

        assert!(inventory_totals(&engine, SOUTH).expect("no stock").is_empty());
    }

    #[test]
    fn low_stock_lists_only_entries_under_threshold() {
        let x = EntityId::from_u128(0xA1);
        let store = MemoryStore::new()
            .with_collection(
                HOSPITALS,
                vec![Record::new().with("_id", x).with("name", "X")],
            )
            .with_collection(
                MEDICATIONS,
                vec![
                    Record::new().with("_id", EntityId::from_u128(0xB1)).with("name", "Amoxicillin").with(
                        STOCK,
                        vec![Record::new().with("hospital_id", x).with("quantity", 500_i64)],
                    ),
                    Record::new().with("_id", EntityId::from_u128(0xB2)).with("name", "Ibuprofen").with(
                        STOCK,
                        vec![Record::new().with("hospital_id", x).with("quantity", 2000_i64)],
                    ),
                ],
            );
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = low_stock_alerts(&engine, 1000).expect("alerts");
        assert_eq!(
            rows,
            vec![LowStockRow {
                medication: "Amoxicillin".into(),
                hospital: "X".into(),
                current_stock: 500,
                threshold: 1000,
            }]
        );
    }

    #[test]
    fn low_stock_over_fixture() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = low_stock_alerts(&engine, 1000).expect("alerts");
        let pairs: Vec<(&str, &str, i64)> = rows
            .iter()
            .map(|r| (r.medication.as_str(), r.hospital.as_str(), r.current_stock))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Amoxicillin", "Central Hospital", 500),
                ("Salbutamol", "North Clinic", 40),
            ]
        );

        assert!(low_stock_alerts(&engine, 0).expect("zero").is_empty());
        let err = low_stock_alerts(&engine, -1).expect_err("negative");
        assert!(matches!(err, ReportError::Validation(_)));
    }

    #[test]
    fn turnover_orders_by_total_stock() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = medication_turnover(&engine).expect("turnover");
        assert_eq!(
            rows,
            vec![
                TurnoverRow {
                    hospital: "North Clinic".into(),
                    medication_count: 2,
                    total_stock: 2040,
                    average_stock: Decimal::new(102000, 2),
                },
                TurnoverRow {
                    hospital: "Central Hospital".into(),
                    medication_count: 2,
                    total_stock: 1700,
                    average_stock: Decimal::new(85000, 2),
                },
            ]
        );
    }

    #[test]
    fn runout_projection_keeps_short_supplies() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = stock_runout_projection(&engine, 150, DEFAULT_DAILY_CONSUMPTION)
            .expect("projection");
        let summary: Vec<(&str, &str, Decimal)> = rows
            .iter()
            .map(|r| (r.medication.as_str(), r.hospital.as_str(), r.days_remaining))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Salbutamol", "North Clinic", Decimal::from(8)),
                ("Amoxicillin", "Central Hospital", Decimal::from(100)),
            ]
        );
    }

    #[test]
    fn runout_projection_validates_inputs() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        assert!(matches!(
            stock_runout_projection(&engine, 10, 0),
            Err(ReportError::Validation(_))
        ));
        assert!(matches!(
            stock_runout_projection(&engine, -5, 5),
            Err(ReportError::Validation(_))
        ));
    }
}
