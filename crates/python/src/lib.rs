#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

mod arrays;
mod dataset;

#[pymodule]
fn pointbatch_rs(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<dataset::PyDataset>()?;
    m.add_class::<dataset::PyEpoch>()?;
    m.add_class::<dataset::PyCalibrationResult>()?;
    Ok(())
}
