//! Request/response logging wrapper

use super::{Info, Middleware};
use crate::context::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Outermost stage: logs every request with method, path, final status,
/// and elapsed time, leveled by status class. The completion event keys on
/// the matched route template when one exists, so log cardinality stays
/// bounded by the ruleset rather than by raw paths.
pub struct Observability {
    next: Arc<dyn Middleware>,
}

impl Observability {
    /// Wrap the rest of the chain.
    pub fn new(next: Arc<dyn Middleware>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Middleware for Observability {
    fn info(&self) -> Info {
        Info { name: "observability", description: "request/response logging" }
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request<Bytes>) -> Response<Bytes> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        info!(method = %method, path = %path, "incoming request");

        let start = Instant::now();
        let res = self.next.handle(ctx, req).await;
        let elapsed = start.elapsed();

        let status = res.status();
        let route = ctx.route_label.as_deref().unwrap_or(&path);
        macro_rules! completion_event {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    method = %method,
                    route = %route,
                    path = %path,
                    status = status.as_u16(),
                    duration_ms = elapsed.as_millis() as u64,
                    "request completed"
                )
            };
        }
        match status.as_u16() {
            500..=599 => completion_event!(tracing::Level::ERROR),
            400..=499 => completion_event!(tracing::Level::WARN),
            _ => completion_event!(tracing::Level::INFO),
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Labeling;

    #[async_trait]
    impl Middleware for Labeling {
        fn info(&self) -> Info {
            Info { name: "labeling", description: "stub" }
        }

        async fn handle(&self, ctx: &mut RequestContext, _req: Request<Bytes>) -> Response<Bytes> {
            ctx.route_label = Some("GET /api/items/{id}".to_string());
            Response::new(Bytes::new())
        }
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn completion_log_keys_on_the_route_template() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let capture = capture.clone();
                move || capture.clone()
            })
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let stage = Observability::new(Arc::new(Labeling));
        let mut ctx = RequestContext::new();
        let req = Request::builder()
            .method("GET")
            .uri("/api/items/i-42")
            .body(Bytes::new())
            .unwrap();
        stage.handle(&mut ctx, req).await;

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("/api/items/{id}"), "completion log missing route template: {logs}");
    }
}
