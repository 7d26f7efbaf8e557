//! Permission checks run after authentication.

use std::sync::Arc;

use crate::request::RequestContext;

pub trait Permission: Send + Sync {
    /// True when `request` may proceed.
    fn has_permission(&self, request: &RequestContext) -> bool;
}

impl<F> Permission for F
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    fn has_permission(&self, request: &RequestContext) -> bool {
        self(request)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

impl Permission for AllowAny {
    fn has_permission(&self, _request: &RequestContext) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
    fn has_permission(&self, request: &RequestContext) -> bool {
        request.is_authenticated()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsAdminUser;

impl Permission for IsAdminUser {
    fn has_permission(&self, request: &RequestContext) -> bool {
        request.is_admin()
    }
}

/// Anyone may read; writes need an authenticated user.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticatedOrReadOnly;

impl Permission for IsAuthenticatedOrReadOnly {
    fn has_permission(&self, request: &RequestContext) -> bool {
        request.is_safe_method() || request.is_authenticated()
    }
}

/// Granted when every member grants; stops at the first denial.
#[derive(Clone, Default)]
pub struct And(pub Vec<Arc<dyn Permission>>);

impl Permission for And {
    fn has_permission(&self, request: &RequestContext) -> bool {
        self.0.iter().all(|p| p.has_permission(request))
    }
}

/// Granted when any member grants; stops at the first grant.
#[derive(Clone, Default)]
pub struct Or(pub Vec<Arc<dyn Permission>>);

impl Permission for Or {
    fn has_permission(&self, request: &RequestContext) -> bool {
        self.0.iter().any(|p| p.has_permission(request))
    }
}
