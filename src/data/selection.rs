use std::collections::BTreeSet;

use super::aggregate::AggregateRecord;
use super::model::{Row, RowId, Schema};

// ---------------------------------------------------------------------------
// Region: the rectangle a brush gesture produces
// ---------------------------------------------------------------------------

/// Closed rectangle over two numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub x_column: String,
    pub y_column: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Region {
    /// Build a region from two opposite corners in data coordinates.
    pub fn from_corners(
        x_column: &str,
        y_column: &str,
        a: [f64; 2],
        b: [f64; 2],
    ) -> Self {
        Region {
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            x_min: a[0].min(b[0]),
            x_max: a[0].max(b[0]),
            y_min: a[1].min(b[1]),
            y_max: a[1].max(b[1]),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x_min <= x && x <= self.x_max && self.y_min <= y && y <= self.y_max
    }
}

// ---------------------------------------------------------------------------
// Selection state: highlighted row identities
// ---------------------------------------------------------------------------

/// Highlighted rows, independent of filtering.
///
/// An empty selection means nothing is highlighted. Ids may refer to rows
/// that the current filters hide; consumers treat those as unmatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    ids: BTreeSet<RowId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_selection(&mut self, ids: BTreeSet<RowId>) {
        self.ids = ids;
    }

    /// Select the rows whose `(x, y)` values fall inside `region`.
    ///
    /// Returns the new selection. Rows missing either coordinate never match.
    pub fn select_region(
        &mut self,
        schema: &Schema,
        rows: &[&Row],
        region: &Region,
    ) -> BTreeSet<RowId> {
        let picked: BTreeSet<RowId> = match (
            schema.index_of(&region.x_column),
            schema.index_of(&region.y_column),
        ) {
            (Some(xi), Some(yi)) => rows
                .iter()
                .filter(|row| {
                    let x = row.at(xi).and_then(|v| v.as_f64());
                    let y = row.at(yi).and_then(|v| v.as_f64());
                    matches!((x, y), (Some(x), Some(y)) if region.contains(x, y))
                })
                .map(|row| row.id)
                .collect(),
            _ => BTreeSet::new(),
        };
        self.ids = picked.clone();
        picked
    }

    /// Select every row contributing to one aggregate.
    pub fn select_group(&mut self, record: &AggregateRecord) {
        self.ids = record.members.iter().copied().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &BTreeSet<RowId> {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Selected ids that are not part of `working_set`.
    pub fn stale_ids(&self, working_set: &[RowId]) -> Vec<RowId> {
        let live: BTreeSet<RowId> = working_set.iter().copied().collect();
        self.ids.difference(&live).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::group_count;
    use crate::data::loader::read_csv;
    use crate::data::model::Value;

    const CARS: &str = "\
Car,MPG,Horsepower,Origin
a,18,130,USA
b,27,88,Japan
c,25,,USA
d,30,70,Europe
";

    #[test]
    fn test_select_region() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let rows: Vec<&Row> = ds.rows().iter().collect();
        let mut selection = SelectionState::new();

        let region = Region::from_corners("Horsepower", "MPG", [100.0, 35.0], [60.0, 20.0]);
        let picked = selection.select_region(&ds.schema, &rows, &region);

        assert_eq!(picked, BTreeSet::from([RowId(1), RowId(3)]));
        assert_eq!(selection.ids(), &picked);
        // Row c has no horsepower and is never brushed.
        assert!(!selection.contains(RowId(2)));
    }

    #[test]
    fn test_region_on_unknown_columns_selects_nothing() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let rows: Vec<&Row> = ds.rows().iter().collect();
        let mut selection = SelectionState::new();
        selection.set_selection(BTreeSet::from([RowId(0)]));

        let region = Region::from_corners("Weight", "MPG", [0.0, 0.0], [1e9, 1e9]);
        assert!(selection.select_region(&ds.schema, &rows, &region).is_empty());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_group_selects_members() {
        let ds = read_csv(CARS.as_bytes(), None).unwrap();
        let rows: Vec<&Row> = ds.rows().iter().collect();
        let records = group_count(&ds.schema, &rows, "Origin");
        let usa = records.iter().find(|r| r.key == Value::from("USA")).unwrap();

        let mut selection = SelectionState::new();
        selection.select_group(usa);
        assert_eq!(selection.len(), 2);
        assert!(selection.contains(RowId(0)) && selection.contains(RowId(2)));

        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_stale_ids() {
        let mut selection = SelectionState::new();
        selection.set_selection(BTreeSet::from([RowId(1), RowId(5)]));
        assert_eq!(selection.stale_ids(&[RowId(0), RowId(1)]), vec![RowId(5)]);
    }
}
