use crate::api::{Api, ApiError, CancelToken};
use crate::journal::Journal;
use crate::types::{CreateUserRequest, Pagination, User};
use std::cell::RefCell;
use std::rc::Rc;

/// Admin-side user store: one page of accounts plus pagination metadata.
pub struct AdminStore {
    api: Rc<dyn Api>,
    journal: Rc<RefCell<Journal>>,
    users: Vec<User>,
    pagination: Pagination,
    loading: bool,
    page_limit: u64,
}

impl AdminStore {
    pub fn new(api: Rc<dyn Api>, journal: Rc<RefCell<Journal>>, page_limit: u64) -> Self {
        Self {
            api,
            journal,
            users: Vec::new(),
            pagination: Pagination::default(),
            loading: false,
            page_limit,
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn list(&mut self, page: u64, cancel: &CancelToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.loading = true;
        let result = self.api.admin_users(page, self.page_limit);
        self.loading = false;

        let data = result.map_err(|e| self.journal_error("admin.users.list", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.users = data.users;
        self.pagination = data.pagination;
        Ok(())
    }

    pub fn create(&mut self, req: &CreateUserRequest, cancel: &CancelToken) -> Result<User, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let created = self
            .api
            .admin_create_user(req)
            .map_err(|e| self.journal_error("admin.users.create", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.users.push(created.clone());
        Ok(created)
    }

    pub fn delete(&mut self, id: &str, cancel: &CancelToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.api
            .admin_delete_user(id)
            .map_err(|e| self.journal_error("admin.users.delete", e))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.users.retain(|u| u.id != id);
        Ok(())
    }

    fn journal_error(&self, operation: &str, error: ApiError) -> ApiError {
        let _ = self.journal.borrow_mut().api_error(operation, &error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::types::{Role, UserPage};
    use tempfile::TempDir;

    fn user(id: &str, name: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            role,
        }
    }

    fn store() -> (Rc<MockApi>, AdminStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let journal = Rc::new(RefCell::new(
            Journal::new(&dir.path().join("journal.jsonl"), "test").unwrap(),
        ));
        let api = Rc::new(MockApi::default());
        let store = AdminStore::new(api.clone(), journal, 10);
        (api, store, dir)
    }

    #[test]
    fn test_list_replaces_users_and_pagination() {
        let (api, mut store, _dir) = store();
        *api.admin_users_result.borrow_mut() = Some(Ok(UserPage {
            users: vec![user("u1", "Ana", Role::Admin), user("u2", "Leo", Role::User)],
            pagination: Pagination {
                total: 2,
                page: 1,
                pages: 1,
                limit: 10,
            },
        }));

        store.list(1, &CancelToken::new()).unwrap();
        assert_eq!(store.users().len(), 2);
        assert_eq!(store.pagination().total, 2);
    }

    #[test]
    fn test_create_appends() {
        let (api, mut store, _dir) = store();
        *api.admin_create_user_result.borrow_mut() = Some(Ok(user("u3", "Eva", Role::User)));

        let req = CreateUserRequest {
            name: "Eva".to_string(),
            email: "eva@example.com".to_string(),
            password: "secret".to_string(),
            rol: Role::User,
        };
        store.create(&req, &CancelToken::new()).unwrap();
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.users()[0].id, "u3");
    }

    #[test]
    fn test_delete_filters_locally() {
        let (api, mut store, _dir) = store();
        *api.admin_users_result.borrow_mut() = Some(Ok(UserPage {
            users: vec![
                user("u1", "Ana", Role::Admin),
                user("u2", "Leo", Role::User),
                user("u3", "Eva", Role::User),
            ],
            pagination: Pagination {
                total: 3,
                page: 1,
                pages: 1,
                limit: 10,
            },
        }));
        store.list(1, &CancelToken::new()).unwrap();

        store.delete("u2", &CancelToken::new()).unwrap();
        let ids: Vec<&str> = store.users().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u3"]);
        assert_eq!(
            api.calls.borrow().as_slice(),
            &["admin_users", "admin_delete_user"]
        );
    }

    #[test]
    fn test_delete_error_keeps_list() {
        let (api, mut store, _dir) = store();
        *api.admin_users_result.borrow_mut() = Some(Ok(UserPage {
            users: vec![user("u1", "Ana", Role::Admin)],
            pagination: Pagination::default(),
        }));
        store.list(1, &CancelToken::new()).unwrap();

        *api.delete_result.borrow_mut() = Some(Err(ApiError::Server {
            status: 403,
            message: "cannot delete yourself".to_string(),
            fields: Vec::new(),
        }));
        assert!(store.delete("u1", &CancelToken::new()).is_err());
        assert_eq!(store.users().len(), 1);
    }
}
