//! Attribute extraction dispatch
//!
//! One extractor per pipeline stage, built over views of the buffered
//! request and (for hooks) response. Dispatch is a closed match over
//! [`AttributeType`]; adding a new extraction source is a new variant plus
//! one arm here.

pub mod grpc;
pub mod json;

use crate::error::{ProxyError, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use sentra_core::{compose, Attribute, AttributeSource, AttributeType};
use serde_json::Value;
use std::collections::HashMap;

/// Read-only view over one side (request or response) of the exchange.
pub struct SourceView<'a> {
    /// Headers of this side
    pub headers: &'a HeaderMap,
    /// Fully-buffered body of this side
    pub body: &'a Bytes,
}

impl SourceView<'_> {
    fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    fn header(&self, key: &str) -> Option<String> {
        self.headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Attribute extractor for one request's pipeline run.
pub struct Extractor<'a> {
    request: SourceView<'a>,
    response: Option<SourceView<'a>>,
    /// Raw query string of the inbound request
    query: Option<&'a str>,
    path_params: &'a HashMap<String, String>,
}

impl<'a> Extractor<'a> {
    /// Extractor over the request side only (request-phase middleware).
    pub fn for_request(
        request: SourceView<'a>,
        query: Option<&'a str>,
        path_params: &'a HashMap<String, String>,
    ) -> Self {
        Self { request, response: None, query, path_params }
    }

    /// Extractor over both sides (response-phase hooks).
    pub fn for_exchange(
        request: SourceView<'a>,
        response: SourceView<'a>,
        query: Option<&'a str>,
        path_params: &'a HashMap<String, String>,
    ) -> Self {
        Self { request, response: Some(response), query, path_params }
    }

    fn view(&self, source: AttributeSource) -> Result<&SourceView<'a>> {
        match source {
            AttributeSource::Request => Ok(&self.request),
            AttributeSource::Response => self.response.as_ref().ok_or_else(|| {
                ProxyError::Extraction(
                    "response source is not available in this phase".to_string(),
                )
            }),
        }
    }

    /// Pull one attribute's value out of its configured source.
    pub fn extract(&self, attr: &Attribute) -> Result<Value> {
        match attr.kind {
            AttributeType::JsonPayload => {
                let selector = if attr.path.is_empty() { &attr.key } else { &attr.path };
                json::extract(self.view(attr.source)?.body, selector)
            }
            AttributeType::GrpcPayload => {
                let view = self.view(attr.source)?;
                let grpc = view
                    .content_type()
                    .is_some_and(|ct| ct.starts_with("application/grpc"));
                if !grpc {
                    return Err(ProxyError::Extraction(
                        "payload is not a grpc message".to_string(),
                    ));
                }
                grpc::extract(view.body, &attr.index)
            }
            AttributeType::Header => {
                if attr.key.is_empty() {
                    return Err(ProxyError::Config("header key field empty".to_string()));
                }
                self.view(attr.source)?
                    .header(&attr.key)
                    .map(Value::String)
                    .ok_or_else(|| {
                        ProxyError::Extraction(format!("header {} is empty", attr.key))
                    })
            }
            AttributeType::Query => {
                if attr.key.is_empty() {
                    return Err(ProxyError::Config("query key field empty".to_string()));
                }
                self.query_param(&attr.key).map(Value::String).ok_or_else(|| {
                    ProxyError::Extraction(format!("query {} is empty", attr.key))
                })
            }
            AttributeType::PathParam => {
                if attr.key.is_empty() {
                    return Err(ProxyError::Config("path param key field empty".to_string()));
                }
                self.path_params
                    .get(&attr.key)
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| {
                        ProxyError::Extraction(format!("path param {} not captured", attr.key))
                    })
            }
            AttributeType::Constant | AttributeType::Composite => {
                if attr.value.is_empty() {
                    return Err(ProxyError::Config("attribute value empty".to_string()));
                }
                Ok(Value::String(attr.value.clone()))
            }
        }
    }

    /// Extract every configured attribute into `out`.
    ///
    /// Composite attributes resolve in a second pass so their `${name}`
    /// placeholders see every non-composite attribute regardless of map
    /// iteration order; unresolved placeholders remain literal.
    pub fn extract_all(
        &self,
        attrs: &HashMap<String, Attribute>,
        out: &mut HashMap<String, Value>,
    ) -> Result<()> {
        for (name, attr) in attrs.iter().filter(|(_, a)| a.kind != AttributeType::Composite) {
            let value = self.extract(attr)?;
            tracing::debug!(attribute = %name, "extracted attribute");
            out.insert(name.clone(), value);
        }
        for (name, attr) in attrs.iter().filter(|(_, a)| a.kind == AttributeType::Composite) {
            if attr.value.is_empty() {
                return Err(ProxyError::Config("attribute value empty".to_string()));
            }
            out.insert(name.clone(), Value::String(compose(&attr.value, out)));
        }
        Ok(())
    }

    fn query_param(&self, key: &str) -> Option<String> {
        let query = self.query?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn attr(kind: AttributeType) -> Attribute {
        Attribute {
            key: String::new(),
            kind,
            index: String::new(),
            path: String::new(),
            params: Vec::new(),
            source: AttributeSource::Request,
            value: String::new(),
        }
    }

    struct Fixture {
        req_headers: HeaderMap,
        req_body: Bytes,
        res_headers: HeaderMap,
        res_body: Bytes,
        params: HashMap<String, String>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut req_headers = HeaderMap::new();
            req_headers.insert("x-user", HeaderValue::from_static("alice"));
            Self {
                req_headers,
                req_body: Bytes::from(serde_json::to_vec(&json!({"foo": "bar"})).unwrap()),
                res_headers: HeaderMap::new(),
                res_body: Bytes::from(serde_json::to_vec(&json!({"id": "r-1"})).unwrap()),
                params: HashMap::from([("project".to_string(), "p1".to_string())]),
            }
        }

        fn extractor(&self) -> Extractor<'_> {
            Extractor::for_exchange(
                SourceView { headers: &self.req_headers, body: &self.req_body },
                SourceView { headers: &self.res_headers, body: &self.res_body },
                Some("team=core&empty="),
                &self.params,
            )
        }
    }

    #[test]
    fn dispatches_by_source() {
        let fx = Fixture::new();
        let ex = fx.extractor();

        let mut a = attr(AttributeType::JsonPayload);
        a.key = "foo".into();
        assert_eq!(ex.extract(&a).unwrap(), json!("bar"));

        a.source = AttributeSource::Response;
        a.key = "id".into();
        assert_eq!(ex.extract(&a).unwrap(), json!("r-1"));
    }

    #[test]
    fn header_query_and_path_param() {
        let fx = Fixture::new();
        let ex = fx.extractor();

        let mut h = attr(AttributeType::Header);
        h.key = "x-user".into();
        assert_eq!(ex.extract(&h).unwrap(), json!("alice"));
        h.key = "x-missing".into();
        assert!(matches!(ex.extract(&h), Err(ProxyError::Extraction(_))));

        let mut q = attr(AttributeType::Query);
        q.key = "team".into();
        assert_eq!(ex.extract(&q).unwrap(), json!("core"));
        q.key = "empty".into();
        assert!(matches!(ex.extract(&q), Err(ProxyError::Extraction(_))));

        let mut p = attr(AttributeType::PathParam);
        p.key = "project".into();
        assert_eq!(ex.extract(&p).unwrap(), json!("p1"));
    }

    #[test]
    fn constant_requires_a_value() {
        let fx = Fixture::new();
        let ex = fx.extractor();

        let mut c = attr(AttributeType::Constant);
        assert!(matches!(ex.extract(&c), Err(ProxyError::Config(_))));
        c.value = "ns1".into();
        assert_eq!(ex.extract(&c).unwrap(), json!("ns1"));
    }

    #[test]
    fn response_source_unavailable_in_request_phase() {
        let fx = Fixture::new();
        let ex = Extractor::for_request(
            SourceView { headers: &fx.req_headers, body: &fx.req_body },
            None,
            &fx.params,
        );

        let mut a = attr(AttributeType::JsonPayload);
        a.key = "id".into();
        a.source = AttributeSource::Response;
        assert!(matches!(ex.extract(&a), Err(ProxyError::Extraction(_))));
    }

    #[test]
    fn composites_resolve_after_other_attributes() {
        let fx = Fixture::new();
        let ex = fx.extractor();

        let mut resource = attr(AttributeType::JsonPayload);
        resource.key = "foo".into();
        let mut urn = attr(AttributeType::Composite);
        urn.value = "item-${resource}-${missing}".into();

        let attrs = HashMap::from([
            ("resource".to_string(), resource),
            ("urn".to_string(), urn),
        ]);
        let mut out = HashMap::new();
        ex.extract_all(&attrs, &mut out).unwrap();

        assert_eq!(out.get("resource"), Some(&json!("bar")));
        assert_eq!(out.get("urn"), Some(&json!("item-bar-${missing}")));
    }

    #[test]
    fn grpc_requires_grpc_content_type() {
        let fx = Fixture::new();
        let ex = fx.extractor();

        let mut g = attr(AttributeType::GrpcPayload);
        g.index = "1".into();
        assert!(matches!(ex.extract(&g), Err(ProxyError::Extraction(_))));
    }
}
