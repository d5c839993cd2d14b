use crate::error::{PointBatchError, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Maps raw label values onto contiguous class ids.
///
/// Label values are sorted ascending and numbered `0..num_classes()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LabelTable", into = "LabelTable")]
pub struct LabelMap {
    values: Vec<i32>,
    names: Vec<String>,
    ignored: Vec<i32>,
    to_idx: HashMap<i32, i32>,
}

#[derive(Serialize, Deserialize)]
struct LabelTable {
    labels: Vec<(i32, String)>,
    #[serde(default)]
    ignored: Vec<i32>,
}

impl From<LabelTable> for LabelMap {
    fn from(table: LabelTable) -> Self {
        LabelMap::new(table.labels).with_ignored(table.ignored)
    }
}

impl From<LabelMap> for LabelTable {
    fn from(map: LabelMap) -> Self {
        LabelTable {
            labels: map.values.into_iter().zip(map.names).collect(),
            ignored: map.ignored,
        }
    }
}

impl LabelMap {
    pub fn new(mut labels: Vec<(i32, String)>) -> Self {
        labels.sort_by_key(|(v, _)| *v);
        labels.dedup_by_key(|(v, _)| *v);

        let to_idx = labels
            .iter()
            .enumerate()
            .map(|(i, (v, _))| (*v, i as i32))
            .collect();
        let (values, names) = labels.into_iter().unzip();

        Self {
            values,
            names,
            ignored: Vec::new(),
            to_idx,
        }
    }

    /// Classes of the SensatUrban benchmark.
    pub fn sensat_urban() -> Self {
        let names = [
            "Ground",
            "High Vegetation",
            "Buildings",
            "Walls",
            "Bridge",
            "Parking",
            "Rail",
            "traffic Roads",
            "Street Furniture",
            "Cars",
            "Footpath",
            "Bikes",
            "Water",
        ];
        Self::new(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| (i as i32, n.to_string()))
                .collect(),
        )
    }

    /// Identity map over `0..num_classes`.
    pub fn identity(num_classes: usize) -> Self {
        Self::new(
            (0..num_classes as i32)
                .map(|v| (v, format!("class_{v}")))
                .collect(),
        )
    }

    pub fn with_ignored(mut self, ignored: Vec<i32>) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn num_classes(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn is_ignored(&self, value: i32) -> bool {
        self.ignored.contains(&value)
    }

    pub fn remap(&self, value: i32) -> Option<i32> {
        self.to_idx.get(&value).copied()
    }

    /// Remap a whole label array, failing on the first value the map does
    /// not know.
    pub fn remap_all(&self, cloud: &str, labels: &[i32]) -> Result<Vec<i32>> {
        labels
            .iter()
            .map(|&v| {
                self.remap(v).ok_or_else(|| {
                    PointBatchError::Config(format!("cloud {cloud:?} has unmapped label value {v}"))
                })
            })
            .collect()
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::sensat_urban()
    }
}
