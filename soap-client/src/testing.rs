//! In-memory transport for protocol tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::SoapError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

type Responder = Arc<dyn Fn(&HttpRequest) -> Result<HttpResponse, SoapError> + Send + Sync>;

/// A [`HttpTransport`] answering from canned routes and recording every request.
///
/// Routes are keyed by method and URL path. Requests without a route get a
/// `404` response.
#[derive(Clone, Default)]
pub struct FakeTransport {
    routes: Arc<Mutex<HashMap<(String, String), Responder>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with a fixed response.
    pub fn route(&self, method: &str, path: &str, response: HttpResponse) {
        self.route_with(method, path, move |_| Ok(response.clone()));
    }

    /// Answer `method path` by calling `responder` with each request.
    pub fn route_with<F>(&self, method: &str, path: &str, responder: F)
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, SoapError> + Send + Sync + 'static,
    {
        self.lock_routes()
            .insert((method.to_string(), path.to_string()), Arc::new(responder));
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock_requests().clone()
    }

    /// Requests sent to `method path`.
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<HttpRequest> {
        self.lock_requests()
            .iter()
            .filter(|r| r.method == method && r.url.path() == path)
            .cloned()
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Responder>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<HttpRequest>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SoapError> {
        self.lock_requests().push(request.clone());
        let responder = self
            .lock_routes()
            .get(&(request.method.clone(), request.url.path().to_string()))
            .cloned();

        match responder {
            Some(responder) => responder(&request),
            None => Ok(HttpResponse::new(404)),
        }
    }
}
