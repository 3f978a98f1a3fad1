use crate::api::{Api, ApiError, CancelToken};
use crate::journal::Journal;
use crate::types::{Category, CategoryRequest};
use std::cell::RefCell;
use std::rc::Rc;

/// Category store. Categories are unpaginated; the in-memory list is the
/// single source of truth between fetches.
pub struct CategoryStore {
    api: Rc<dyn Api>,
    journal: Rc<RefCell<Journal>>,
    categories: Vec<Category>,
    loading: bool,
}

impl CategoryStore {
    pub fn new(api: Rc<dyn Api>, journal: Rc<RefCell<Journal>>) -> Self {
        Self {
            api,
            journal,
            categories: Vec::new(),
            loading: false,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Replace the list wholesale from one server response.
    pub fn list(&mut self, cancel: &CancelToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.loading = true;
        let result = self.api.categories();
        self.loading = false;

        let categories = result.map_err(|e| self.journal_error("categories.list", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.categories = categories;
        Ok(())
    }

    /// Fetch a single category without touching the list.
    pub fn get(&mut self, id: &str, cancel: &CancelToken) -> Result<Category, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.loading = true;
        let result = self.api.category(id);
        self.loading = false;
        result.map_err(|e| self.journal_error("categories.get", e))
    }

    /// Create on the server, then append the canonical entity.
    pub fn create(&mut self, req: &CategoryRequest, cancel: &CancelToken) -> Result<Category, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let created = self
            .api
            .create_category(req)
            .map_err(|e| self.journal_error("categories.create", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.categories.push(created.clone());
        Ok(created)
    }

    /// Update on the server, then replace the matching entity by id.
    pub fn update(
        &mut self,
        id: &str,
        req: &CategoryRequest,
        cancel: &CancelToken,
    ) -> Result<Category, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let updated = self
            .api
            .update_category(id, req)
            .map_err(|e| self.journal_error("categories.update", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        for category in &mut self.categories {
            if category.id == id {
                *category = updated.clone();
            }
        }
        Ok(updated)
    }

    /// Delete on the server, then drop the entity from the local list.
    pub fn delete(&mut self, id: &str, cancel: &CancelToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.api
            .delete_category(id)
            .map_err(|e| self.journal_error("categories.delete", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.categories.retain(|c| c.id != id);
        Ok(())
    }

    fn journal_error(&self, operation: &str, error: ApiError) -> ApiError {
        let _ = self.journal.borrow_mut().api_error(operation, &error);
        error
    }
}
