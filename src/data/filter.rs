use std::collections::BTreeMap;

use super::model::{Dataset, Row, RowId, Schema, Value};

// ---------------------------------------------------------------------------
// Filter predicate: what a single column accepts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FilterPredicate {
    /// No constraint.
    All,
    /// Exactly one value.
    Equals(Value),
    /// Closed numeric interval `[lo, hi]`.
    Range { lo: f64, hi: f64 },
}

impl FilterPredicate {
    /// Closed interval predicate; inverted bounds are swapped.
    pub fn range(lo: f64, hi: f64) -> Self {
        if lo > hi {
            FilterPredicate::Range { lo: hi, hi: lo }
        } else {
            FilterPredicate::Range { lo, hi }
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FilterPredicate::All => true,
            FilterPredicate::Equals(expected) => value == expected,
            FilterPredicate::Range { lo, hi } => value
                .as_f64()
                .is_some_and(|v| *lo <= v && v <= *hi),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter state: the active predicate per column
// ---------------------------------------------------------------------------

/// Per-column predicates, combined by conjunction.
/// A column absent from the map accepts every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    predicates: BTreeMap<String, FilterPredicate>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the predicate for `column`. `All` removes it.
    pub fn set_predicate(&mut self, column: &str, predicate: FilterPredicate) {
        if predicate == FilterPredicate::All {
            self.predicates.remove(column);
        } else {
            self.predicates.insert(column.to_string(), predicate);
        }
    }

    pub fn clear_predicate(&mut self, column: &str) {
        self.predicates.remove(column);
    }

    /// Clear every predicate back to accept-all.
    pub fn reset(&mut self) {
        self.predicates.clear();
    }

    /// Current predicate for `column`, `All` when none is set.
    pub fn predicate(&self, column: &str) -> &FilterPredicate {
        self.predicates.get(column).unwrap_or(&FilterPredicate::All)
    }

    pub fn is_active(&self) -> bool {
        !self.predicates.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = (&str, &FilterPredicate)> {
        self.predicates.iter().map(|(c, p)| (c.as_str(), p))
    }

    /// Rows passing every predicate, in input order.
    ///
    /// Predicates on columns the schema does not know are skipped.
    pub fn evaluate<'a>(&self, schema: &Schema, rows: &'a [Row]) -> Vec<&'a Row> {
        let bound: Vec<(usize, &FilterPredicate)> = self
            .predicates
            .iter()
            .filter_map(|(col, pred)| schema.index_of(col).map(|idx| (idx, pred)))
            .collect();

        rows.iter()
            .filter(|row| {
                bound.iter().all(|(idx, pred)| match row.at(*idx) {
                    Some(value) => pred.accepts(value),
                    None => pred.accepts(&Value::Missing),
                })
            })
            .collect()
    }

    /// Ids of the rows of `dataset` passing every predicate.
    pub fn working_set(&self, dataset: &Dataset) -> Vec<RowId> {
        self.evaluate(&dataset.schema, dataset.rows())
            .into_iter()
            .map(|row| row.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;

    const CARS: &str = "\
Car,Manufacturer,MPG,Cylinders,Origin
a,ford,18,8,US
b,datsun,27,4,Japan
c,ford,25,4,US
d,vw,30,4,Europe
e,ford,15,6,US
";

    fn ids(rows: &[&Row]) -> Vec<usize> {
        rows.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn test_equality_filter_preserves_order() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let mut filters = FilterState::new();
        filters.set_predicate("Manufacturer", FilterPredicate::Equals("ford".into()));

        let first = filters.evaluate(&ds.schema, ds.rows());
        assert_eq!(ids(&first), vec![0, 2, 4]);

        // Re-evaluating the same predicates is stable.
        let second = filters.evaluate(&ds.schema, ds.rows());
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_conjunction_of_predicates() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let mut filters = FilterState::new();
        filters.set_predicate("Origin", FilterPredicate::Equals("US".into()));
        filters.set_predicate("Cylinders", FilterPredicate::Equals(Value::Number(4.0)));
        assert_eq!(filters.working_set(&ds), vec![RowId(2)]);
    }

    #[test]
    fn test_range_filter() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let mut filters = FilterState::new();
        filters.set_predicate("MPG", FilterPredicate::range(30.0, 18.0));
        assert_eq!(filters.predicate("MPG"), &FilterPredicate::Range { lo: 18.0, hi: 30.0 });
        assert_eq!(filters.working_set(&ds), vec![RowId(0), RowId(1), RowId(2), RowId(3)]);

        // Text never falls inside a numeric interval.
        filters.set_predicate("Origin", FilterPredicate::range(0.0, 100.0));
        assert!(filters.working_set(&ds).is_empty());
    }

    #[test]
    fn test_all_and_reset_restore_every_row() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let everything = FilterState::new().working_set(&ds);
        assert_eq!(everything.len(), ds.len());

        let mut filters = FilterState::new();
        filters.set_predicate("Origin", FilterPredicate::Equals("US".into()));
        filters.set_predicate("Manufacturer", FilterPredicate::Equals("ford".into()));
        assert!(filters.is_active());

        filters.set_predicate("Origin", FilterPredicate::All);
        assert_eq!(filters.predicate("Origin"), &FilterPredicate::All);
        assert_eq!(filters.active().count(), 1);

        filters.clear_predicate("Manufacturer");
        assert!(!filters.is_active());
        filters.set_predicate("Origin", FilterPredicate::Equals("US".into()));

        filters.reset();
        assert!(!filters.is_active());
        assert_eq!(filters.working_set(&ds), everything);
    }

    #[test]
    fn test_unknown_column_is_ignored() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let mut filters = FilterState::new();
        filters.set_predicate("Colour", FilterPredicate::Equals("red".into()));
        assert_eq!(filters.working_set(&ds).len(), ds.len());
    }
}
