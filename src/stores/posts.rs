use crate::api::{Api, ApiError, CancelToken};
use crate::journal::Journal;
use crate::types::{Pagination, Post, PostRequest};
use std::cell::RefCell;
use std::rc::Rc;

/// Post store: one page of listings plus its pagination metadata.
pub struct PostStore {
    api: Rc<dyn Api>,
    journal: Rc<RefCell<Journal>>,
    posts: Vec<Post>,
    pagination: Pagination,
    loading: bool,
    page_limit: u64,
    sort: Option<String>,
}

impl PostStore {
    pub fn new(
        api: Rc<dyn Api>,
        journal: Rc<RefCell<Journal>>,
        page_limit: u64,
        sort: Option<String>,
    ) -> Self {
        Self {
            api,
            journal,
            posts: Vec::new(),
            pagination: Pagination::default(),
            loading: false,
            page_limit,
            sort,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Replace list and pagination wholesale from one page response.
    pub fn list(&mut self, page: u64, cancel: &CancelToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.loading = true;
        let result = self.api.posts(page, self.page_limit, self.sort.as_deref());
        self.loading = false;

        let data = result.map_err(|e| self.journal_error("posts.list", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.posts = data.posts;
        self.pagination = data.pagination;
        Ok(())
    }

    /// Fetch one post without touching the current page.
    pub fn get(&mut self, id: &str, cancel: &CancelToken) -> Result<Post, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.loading = true;
        let result = self.api.post(id);
        self.loading = false;
        result.map_err(|e| self.journal_error("posts.get", e))
    }

    /// Create on the server, then append the canonical entity. The append
    /// ignores the current sort and page bounds; the next `list` squares
    /// the view with the server again.
    pub fn create(&mut self, req: &PostRequest, cancel: &CancelToken) -> Result<Post, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let created = self
            .api
            .create_post(req)
            .map_err(|e| self.journal_error("posts.create", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.posts.push(created.clone());
        Ok(created)
    }

    pub fn update(
        &mut self,
        id: &str,
        req: &PostRequest,
        cancel: &CancelToken,
    ) -> Result<Post, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let updated = self
            .api
            .update_post(id, req)
            .map_err(|e| self.journal_error("posts.update", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        for post in &mut self.posts {
            if post.id == id {
                *post = updated.clone();
            }
        }
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str, cancel: &CancelToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.api
            .delete_post(id)
            .map_err(|e| self.journal_error("posts.delete", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.posts.retain(|p| p.id != id);
        Ok(())
    }

    fn journal_error(&self, operation: &str, error: ApiError) -> ApiError {
        let _ = self.journal.borrow_mut().api_error(operation, &error);
        error
    }
}
