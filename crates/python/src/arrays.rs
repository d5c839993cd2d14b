use numpy::{Element, PyArray1, PyArray2, PyArrayMethods, PyUntypedArrayMethods};
use pointbatch::NeighborMatrix;
use pyo3::prelude::*;

fn contiguity_error() -> PyErr {
    pyo3::exceptions::PyValueError::new_err(
        "array must be C-contiguous (row-major). \
         Use numpy.ascontiguousarray(arr) to convert.",
    )
}

fn read_rows<T: Element + Copy>(
    array: &Bound<'_, PyArray2<T>>,
    what: &str,
    cast: impl Fn(T) -> f32,
) -> PyResult<Vec<[f32; 3]>> {
    // Reject Fortran-order arrays, their memory layout would be misread.
    if !array.is_c_contiguous() {
        return Err(contiguity_error());
    }
    let readonly = array.readonly();
    let shape = readonly.shape();
    if shape.len() != 2 || shape[1] != 3 {
        return Err(pyo3::exceptions::PyValueError::new_err(format!(
            "{what}: expected shape (N, 3)"
        )));
    }
    let slice = readonly.as_slice().map_err(|_| {
        pyo3::exceptions::PyValueError::new_err("failed to read array as contiguous slice")
    })?;
    Ok(slice
        .chunks_exact(3)
        .map(|c| [cast(c[0]), cast(c[1]), cast(c[2])])
        .collect())
}

/// Read an (N, 3) float32 or float64 array. float64 is cast to float32.
pub fn rows3_from_numpy(array: &Bound<'_, PyAny>, what: &str) -> PyResult<Vec<[f32; 3]>> {
    if let Ok(arr) = array.downcast::<PyArray2<f32>>() {
        return read_rows(arr, what, |v| v);
    }
    if let Ok(arr) = array.downcast::<PyArray2<f64>>() {
        return read_rows(arr, what, |v| v as f32);
    }
    Err(pyo3::exceptions::PyTypeError::new_err(format!(
        "{what}: expected NumPy array with dtype float32 or float64, shape (N, 3)"
    )))
}

/// Read a 1-D int32 or int64 label array.
pub fn labels_from_numpy(array: &Bound<'_, PyAny>) -> PyResult<Vec<i32>> {
    if let Ok(arr) = array.downcast::<PyArray1<i32>>() {
        return Ok(arr.to_vec()?);
    }
    if let Ok(arr) = array.downcast::<PyArray1<i64>>() {
        return arr
            .to_vec()?
            .into_iter()
            .map(|v| {
                i32::try_from(v).map_err(|_| {
                    pyo3::exceptions::PyValueError::new_err(format!("label {v} out of int32 range"))
                })
            })
            .collect();
    }
    Err(pyo3::exceptions::PyTypeError::new_err(
        "labels: expected 1-D NumPy array with dtype int32 or int64",
    ))
}

pub fn matrix<'py, T: Element>(
    py: Python<'py>,
    data: Vec<T>,
    rows: usize,
    cols: usize,
) -> PyResult<Bound<'py, PyArray2<T>>> {
    PyArray1::from_vec_bound(py, data).reshape([rows, cols])
}

pub fn rows_to_numpy<'py, const N: usize>(
    py: Python<'py>,
    rows: &[[f32; N]],
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    matrix(py, flat, rows.len(), N)
}

pub fn indices_to_numpy<'py>(py: Python<'py>, values: &[usize]) -> Bound<'py, PyArray1<i64>> {
    PyArray1::from_vec_bound(py, values.iter().map(|&v| v as i64).collect())
}

/// Neighbor matrices go out as int32, sentinel included.
pub fn neighbors_to_numpy<'py>(
    py: Python<'py>,
    m: &NeighborMatrix,
) -> PyResult<Bound<'py, PyArray2<i32>>> {
    let data = m.as_slice().iter().map(|&v| v as i32).collect();
    matrix(py, data, m.rows(), m.width())
}
