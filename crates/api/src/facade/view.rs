//! View facade
//!
//! Design-document management and view reads. Staleness and key arguments
//! are validated and encoded here; rows come back decoded.

use datastore_core::{DesignDocument, DesignNamespace, Error, Result, ViewRow};

use super::convert::{map_error, view_row_from};
use super::impl_::Datastore;
use super::types::{design_namespace, ViewQuery};

/// View facade - map/reduce views over the bound bucket
pub trait ViewFacade {
    /// Query `design/view`
    ///
    /// `NotFound` names the missing design document or view.
    fn view(&self, design: &str, view: &str, query: &ViewQuery) -> Result<Vec<ViewRow>>;

    /// Fetch a design document
    fn design_get(&self, name: &str, namespace: DesignNamespace) -> Result<DesignDocument>;

    /// Create or wholly replace a design document
    ///
    /// Definitions the store cannot compile are `InvalidArgument`.
    fn design_create(&self, document: &DesignDocument, namespace: DesignNamespace)
        -> Result<()>;
}

impl ViewFacade for Datastore {
    fn view(&self, design: &str, view: &str, query: &ViewQuery) -> Result<Vec<ViewRow>> {
        let _guard = self.span().enter();
        let options = query.to_view_options()?;
        let result = self
            .client()
            .view_query(design, view, &options)
            .map_err(|e| map_error(e, "view", design))?;
        Ok(result.rows.into_iter().map(view_row_from).collect())
    }

    fn design_get(&self, name: &str, namespace: DesignNamespace) -> Result<DesignDocument> {
        let _guard = self.span().enter();
        let body = self
            .client()
            .get_design_document(name, design_namespace(namespace))
            .map_err(|e| map_error(e, "design_get", name))?;
        DesignDocument::from_json(name, &body)
            .map_err(|e| Error::unexpected("design_get", name, e.to_string()))
    }

    fn design_create(
        &self,
        document: &DesignDocument,
        namespace: DesignNamespace,
    ) -> Result<()> {
        let _guard = self.span().enter();
        if document.name.trim().is_empty() {
            return Err(Error::invalid_argument("design document name must not be empty"));
        }
        self.client()
            .upsert_design_document(&document.name, &document.to_json(), design_namespace(namespace))
            .map_err(|e| map_error(e, "design_create", &document.name))
    }
}
