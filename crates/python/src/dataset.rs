use crate::arrays::{
    indices_to_numpy, labels_from_numpy, matrix, neighbors_to_numpy, rows3_from_numpy,
    rows_to_numpy,
};
use numpy::{PyArray1, PyArrayMethods};
use pointbatch::{
    Batch, BatchGenerator, Cloud, Dataset, DatasetConfig, InputPipeline, LabelMap, ModelInputs,
    PointBatchError, Split, SplitTable,
};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn py_err(e: PointBatchError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

#[pyclass(name = "CalibrationResult")]
#[derive(Debug, Clone)]
pub struct PyCalibrationResult {
    #[pyo3(get)]
    pub batch_limit: f64,
    #[pyo3(get)]
    pub batch_estimate: f64,
    #[pyo3(get)]
    pub converged: bool,
    #[pyo3(get)]
    pub neighborhood_limits: Vec<usize>,
    #[pyo3(get)]
    pub calibration_batches: usize,
}

#[pymethods]
impl PyCalibrationResult {
    pub fn __repr__(&self) -> String {
        format!(
            "CalibrationResult(batch_limit={:.0}, converged={}, neighborhood_limits={:?})",
            self.batch_limit, self.converged, self.neighborhood_limits
        )
    }
}

#[pyclass(name = "Dataset")]
#[derive(Debug, Clone)]
pub struct PyDataset {
    inner: Dataset,
}

#[pymethods]
impl PyDataset {
    /// Build from per-cloud arrays. Splits come from the cloud names: the
    /// `validation` and `test` lists when given, the SensatUrban layout
    /// otherwise.
    #[new]
    #[pyo3(signature = (names, points, colors, labels, config_json=None, validation=None, test=None, num_classes=None))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        names: Vec<String>,
        points: Vec<Bound<'_, PyAny>>,
        colors: Vec<Bound<'_, PyAny>>,
        labels: Vec<Option<Bound<'_, PyAny>>>,
        config_json: Option<&str>,
        validation: Option<Vec<String>>,
        test: Option<Vec<String>>,
        num_classes: Option<usize>,
    ) -> PyResult<Self> {
        if points.len() != names.len() || colors.len() != names.len() || labels.len() != names.len() {
            return Err(pyo3::exceptions::PyValueError::new_err(
                "names, points, colors and labels must have the same length",
            ));
        }
        let config = match config_json {
            Some(json) => DatasetConfig::from_json(json).map_err(py_err)?,
            None => DatasetConfig::default(),
        };
        let table = match (validation, test) {
            (None, None) => SplitTable::sensat_urban(),
            (v, t) => SplitTable::new(v.unwrap_or_default(), t.unwrap_or_default()),
        };
        let label_map = match num_classes {
            Some(n) => LabelMap::identity(n),
            None => LabelMap::sensat_urban(),
        };

        let mut clouds = Vec::with_capacity(names.len());
        for (((name, pts), cols), lbls) in names.into_iter().zip(points).zip(colors).zip(labels) {
            let split = table.assign(&name);
            let pts = rows3_from_numpy(&pts, "points")?;
            let cols = rows3_from_numpy(&cols, "colors")?;
            let lbls = lbls.map(|l| labels_from_numpy(&l)).transpose()?;
            clouds.push(Cloud::new(name, split, pts, cols, lbls).map_err(py_err)?);
        }

        let inner = Dataset::new(clouds, label_map, config).map_err(py_err)?;
        Ok(Self { inner })
    }

    #[pyo3(signature = (seed=0))]
    pub fn calibrate(&mut self, py: Python<'_>, seed: u64) -> PyResult<PyCalibrationResult> {
        let calibration = py
            .allow_threads(|| self.inner.calibrate(seed).cloned())
            .map_err(py_err)?;
        Ok(PyCalibrationResult {
            batch_limit: calibration.budget.limit,
            batch_estimate: calibration.budget.estimate,
            converged: calibration.budget.converged,
            neighborhood_limits: calibration.neighbors.limits,
            calibration_batches: calibration.neighbors.batches,
        })
    }

    #[getter]
    pub fn batch_limit(&self) -> Option<f64> {
        self.inner.batch_limit()
    }

    #[setter]
    pub fn set_batch_limit(&mut self, limit: f64) -> PyResult<()> {
        self.inner.set_batch_limit(limit).map_err(py_err)
    }

    #[getter]
    pub fn neighborhood_limits(&self) -> Vec<usize> {
        self.inner.neighbor_limits().to_vec()
    }

    #[setter]
    pub fn set_neighborhood_limits(&mut self, limits: Vec<usize>) -> PyResult<()> {
        self.inner.set_neighbor_limits(limits).map_err(py_err)
    }

    #[getter]
    pub fn num_classes(&self) -> usize {
        self.inner.label_map().num_classes()
    }

    pub fn config_json(&self) -> String {
        self.inner.config().to_json()
    }

    pub fn num_clouds(&self, split: &str) -> PyResult<usize> {
        let split: Split = split.parse().map_err(py_err)?;
        Ok(self.inner.clouds().split(split).len())
    }

    /// One pass over `split`; yields a dict of NumPy arrays per batch.
    #[pyo3(signature = (split, seed=0))]
    pub fn epoch(&self, split: &str, seed: u64) -> PyResult<PyEpoch> {
        let split: Split = split.parse().map_err(py_err)?;
        let generator = self.inner.epoch(split, seed).map_err(py_err)?;
        let pipeline = self.inner.pipeline().map_err(py_err)?;
        Ok(PyEpoch {
            generator,
            pipeline,
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
        })
    }

    pub fn __repr__(&self) -> String {
        format!(
            "Dataset(training={}, validation={}, test={})",
            self.inner.clouds().split(Split::Training).len(),
            self.inner.clouds().split(Split::Validation).len(),
            self.inner.clouds().split(Split::Test).len()
        )
    }
}

#[pyclass(name = "Epoch")]
pub struct PyEpoch {
    generator: BatchGenerator,
    pipeline: InputPipeline,
    rng: StdRng,
}

#[pymethods]
impl PyEpoch {
    pub fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    pub fn __next__<'py>(&mut self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyDict>>> {
        let Self {
            generator,
            pipeline,
            rng,
        } = self;
        let prepared = py.allow_threads(|| {
            generator.next().map(|batch| {
                let inputs = pipeline.prepare(&batch, rng);
                (batch, inputs)
            })
        });
        match prepared {
            Some((batch, inputs)) => Ok(Some(batch_to_dict(py, &batch, &inputs)?)),
            None => Ok(None),
        }
    }

    #[getter]
    pub fn regions_drawn(&self) -> usize {
        self.generator.regions_drawn()
    }

    #[getter]
    pub fn batch_limit(&self) -> usize {
        self.generator.budget()
    }
}

fn batch_to_dict<'py>(
    py: Python<'py>,
    batch: &Batch,
    inputs: &ModelInputs,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("points", rows_to_numpy(py, &batch.points)?)?;
    dict.set_item("features_raw", rows_to_numpy(py, &batch.features)?)?;
    dict.set_item("labels", PyArray1::from_slice_bound(py, &batch.labels))?;
    dict.set_item("lengths", indices_to_numpy(py, &batch.lengths))?;
    dict.set_item("point_indices", indices_to_numpy(py, &batch.point_indices))?;
    dict.set_item("cloud_indices", indices_to_numpy(py, &batch.cloud_indices))?;

    let h = &inputs.hierarchy;
    let mut layer_points = Vec::with_capacity(h.num_layers());
    let mut layer_lengths = Vec::with_capacity(h.num_layers());
    let mut neighbors = Vec::with_capacity(h.num_layers());
    let mut pools = Vec::with_capacity(h.num_layers());
    let mut upsamples = Vec::with_capacity(h.num_layers());
    for layer in &h.layers {
        layer_points.push(rows_to_numpy(py, &layer.points)?);
        layer_lengths.push(indices_to_numpy(py, &layer.lengths));
        neighbors.push(neighbors_to_numpy(py, &layer.neighbors)?);
        pools.push(neighbors_to_numpy(py, &layer.pools)?);
        upsamples.push(neighbors_to_numpy(py, &layer.upsamples)?);
    }
    dict.set_item("layer_points", layer_points)?;
    dict.set_item("layer_lengths", layer_lengths)?;
    dict.set_item("neighbors", neighbors)?;
    dict.set_item("pools", pools)?;
    dict.set_item("upsamples", upsamples)?;

    let features = &inputs.features;
    dict.set_item(
        "features",
        matrix(py, features.as_slice().to_vec(), features.rows(), features.dim())?,
    )?;
    dict.set_item("weights", PyArray1::from_slice_bound(py, &h.weights))?;
    dict.set_item("batch_inds_first", neighbors_to_numpy(py, &h.first_batch_inds)?)?;
    dict.set_item("batch_inds_last", neighbors_to_numpy(py, &h.last_batch_inds)?)?;
    dict.set_item("scales", rows_to_numpy(py, &inputs.scales())?)?;
    let rotations: Vec<[f32; 9]> = inputs
        .rotations()
        .iter()
        .map(|r| {
            [
                r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
            ]
        })
        .collect();
    let flat: Vec<f32> = rotations.iter().flatten().copied().collect();
    dict.set_item(
        "rotations",
        PyArray1::from_vec_bound(py, flat).reshape([rotations.len(), 3, 3])?,
    )?;
    Ok(dict)
}
