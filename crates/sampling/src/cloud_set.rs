use pointbatch_core::{Cloud, LabelMap, PointBatchError, Result, Split, Timed};
use pointbatch_spatial::KdTree;
use rayon::prelude::*;
use std::sync::Arc;

/// A cloud together with its spatial index and remapped class ids.
///
/// Immutable once built; shared read-only between generators and threads.
#[derive(Debug, Clone)]
pub struct IndexedCloud {
    pub cloud: Cloud,
    pub tree: KdTree,
    /// Contiguous class ids, `None` for test clouds.
    pub class_ids: Option<Vec<i32>>,
}

impl IndexedCloud {
    pub fn new(cloud: Cloud, label_map: &LabelMap) -> Result<Self> {
        if cloud.is_empty() {
            return Err(PointBatchError::Config(format!(
                "cloud {:?} has no points",
                cloud.name
            )));
        }

        let class_ids = if cloud.split.is_labelled() {
            let labels = cloud.labels.as_deref().ok_or_else(|| {
                PointBatchError::Config(format!(
                    "{} cloud {:?} has no labels",
                    cloud.split, cloud.name
                ))
            })?;
            Some(label_map.remap_all(&cloud.name, labels)?)
        } else {
            None
        };

        let tree = KdTree::from_cloud(&cloud);
        Ok(Self {
            cloud,
            tree,
            class_ids,
        })
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.cloud.name
    }

    pub fn points(&self) -> &[[f32; 3]] {
        &self.cloud.points
    }
}

/// All indexed clouds, grouped by split.
#[derive(Debug, Clone)]
pub struct CloudSet {
    splits: [Arc<[IndexedCloud]>; 3],
}

fn slot(split: Split) -> usize {
    match split {
        Split::Training => 0,
        Split::Validation => 1,
        Split::Test => 2,
    }
}

impl CloudSet {
    /// Index every cloud (in parallel) and group them by split, preserving
    /// input order within a split.
    pub fn new(clouds: Vec<Cloud>, label_map: &LabelMap) -> Result<Self> {
        let _t = Timed::info("Indexing clouds");

        let indexed: Vec<IndexedCloud> = clouds
            .into_par_iter()
            .map(|cloud| IndexedCloud::new(cloud, label_map))
            .collect::<Result<_>>()?;

        let mut groups: [Vec<IndexedCloud>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for cloud in indexed {
            groups[slot(cloud.cloud.split)].push(cloud);
        }

        for split in Split::ALL {
            let group = &groups[slot(split)];
            let points: usize = group.iter().map(IndexedCloud::len).sum();
            log::info!("{split}: {} clouds, {points} points", group.len());
        }

        let [training, validation, test] = groups;
        Ok(Self {
            splits: [training.into(), validation.into(), test.into()],
        })
    }

    pub fn split(&self, split: Split) -> &Arc<[IndexedCloud]> {
        &self.splits[slot(split)]
    }

    /// Clouds of `split`, failing if there are none.
    pub fn require(&self, split: Split) -> Result<&Arc<[IndexedCloud]>> {
        let clouds = self.split(split);
        if clouds.is_empty() {
            return Err(PointBatchError::EmptySplit(split));
        }
        Ok(clouds)
    }

    /// Training clouds if there are any, otherwise test clouds.
    pub fn calibration_split(&self) -> Split {
        if self.split(Split::Training).is_empty() {
            Split::Test
        } else {
            Split::Training
        }
    }

    pub fn num_clouds(&self) -> usize {
        self.splits.iter().map(|s| s.len()).sum()
    }
}
