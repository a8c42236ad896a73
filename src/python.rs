//! Python host surface: documents cross the boundary as plain dicts.
use crate::config::ReconcileOptions;
use crate::converters::{json_to_pyobject, python_to_json};
use crate::driver::{reconcile, Reconciler, Reconciliation};
use crate::editing;
use crate::errors::ReconcilerError;
use crate::types::Document;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::sync::{Mutex, MutexGuard};

#[pyclass]
pub struct DocumentReconciler {
    session: Mutex<Reconciler>,
}

fn document_from_py<'py>(py: Python<'py>, obj: &Bound<'py, PyAny>) -> Result<Document, ReconcilerError> {
    Document::from_value(python_to_json(py, obj)?)
}

fn document_to_py<'py>(py: Python<'py>, document: &Document) -> PyResult<Bound<'py, PyAny>> {
    json_to_pyobject(py, &document.to_value()?)
}

fn result_to_py<'py>(py: Python<'py>, result: &Reconciliation<'_>) -> PyResult<Bound<'py, PyAny>> {
    let dict = PyDict::new(py);
    dict.set_item("changed", result.changed())?;
    dict.set_item("converged", result.converged)?;
    dict.set_item("passes", result.passes)?;

    let committed = PyList::empty(py);
    for phase in &result.committed {
        committed.append(phase.to_string())?;
    }
    dict.set_item("committed", committed)?;
    dict.set_item("document", document_to_py(py, &result.document)?)?;
    Ok(dict.into_any())
}

impl DocumentReconciler {
    fn session(&self) -> Result<MutexGuard<'_, Reconciler>, ReconcilerError> {
        self.session.lock().map_err(|_| ReconcilerError::LockPoisoned)
    }
}

#[pymethods]
impl DocumentReconciler {
    #[new]
    #[pyo3(signature = (**options))]
    fn new<'py>(py: Python<'py>, options: Option<&Bound<'py, PyDict>>) -> PyResult<Self> {
        let options = match options {
            Some(kwargs) => ReconcileOptions::from_value(python_to_json(py, kwargs.as_any())?)?,
            None => ReconcileOptions::default(),
        };
        log::info!("DocumentReconciler: created ({:?})", options.mode);
        Ok(DocumentReconciler {
            session: Mutex::new(Reconciler::new(options)),
        })
    }

    /// Pure reconciliation; does not touch the session guard.
    fn reconcile<'py>(&self, py: Python<'py>, document: &Bound<'py, PyAny>) -> PyResult<Bound<'py, PyAny>> {
        let options = self.session()?.options().clone();
        let doc = document_from_py(py, document)?;
        let result = reconcile(&doc, &options);
        result_to_py(py, &result)
    }

    /// Reactive entry point; returns None when the change is ignored.
    fn on_change<'py>(
        &self,
        py: Python<'py>,
        document: &Bound<'py, PyAny>,
    ) -> PyResult<Option<Bound<'py, PyAny>>> {
        let doc = document_from_py(py, document)?;
        let mut session = self.session()?;
        match session.on_change(&doc) {
            Some(result) => Ok(Some(result_to_py(py, &result)?)),
            None => Ok(None),
        }
    }

    fn release(&self) -> PyResult<()> {
        self.session()?.release();
        Ok(())
    }

    fn reset(&self) -> PyResult<()> {
        self.session()?.reset();
        Ok(())
    }

    fn is_running(&self) -> PyResult<bool> {
        Ok(self.session()?.status() == crate::types::ReconciliationStatus::Running)
    }

    fn seed<'py>(&self, py: Python<'py>, document: &Bound<'py, PyAny>) -> PyResult<Bound<'py, PyAny>> {
        let mut doc = document_from_py(py, document)?;
        editing::ensure_seeded(&mut doc);
        document_to_py(py, &doc)
    }

    fn delete_container<'py>(
        &self,
        py: Python<'py>,
        document: &Bound<'py, PyAny>,
        index: usize,
    ) -> PyResult<Bound<'py, PyAny>> {
        let mut doc = document_from_py(py, document)?;
        editing::delete_container(&mut doc, index)?;
        document_to_py(py, &doc)
    }

    fn delete_container_by_number<'py>(
        &self,
        py: Python<'py>,
        document: &Bound<'py, PyAny>,
        container_no: &str,
    ) -> PyResult<Bound<'py, PyAny>> {
        let mut doc = document_from_py(py, document)?;
        editing::delete_container_by_number(&mut doc, container_no);
        document_to_py(py, &doc)
    }

    fn add_operation<'py>(&self, py: Python<'py>, document: &Bound<'py, PyAny>) -> PyResult<Bound<'py, PyAny>> {
        let mut doc = document_from_py(py, document)?;
        editing::add_operation(&mut doc);
        document_to_py(py, &doc)
    }

    fn delete_operation<'py>(
        &self,
        py: Python<'py>,
        document: &Bound<'py, PyAny>,
        index: usize,
    ) -> PyResult<Bound<'py, PyAny>> {
        let mut doc = document_from_py(py, document)?;
        editing::delete_operation(&mut doc, index)?;
        document_to_py(py, &doc)
    }

    fn sync_status<'py>(&self, py: Python<'py>, document: &Bound<'py, PyAny>) -> PyResult<String> {
        let doc = document_from_py(py, document)?;
        Ok(editing::sync_status(&doc).to_string())
    }
}
