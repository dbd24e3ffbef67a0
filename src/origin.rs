// Opaque handles for the transport's inbound request and outbound response
use bytes::Bytes;
use http::header::{HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode, Uri};
use std::fmt;
use std::sync::Arc;

/// Shared handle to the inbound request. Cloning shares the message.
#[derive(Clone)]
pub struct OriginRequest(Arc<Request<Bytes>>);

impl OriginRequest {
    pub fn new(req: Request<Bytes>) -> Self {
        OriginRequest(Arc::new(req))
    }

    pub fn method(&self) -> &Method {
        self.0.method()
    }

    pub fn uri(&self) -> &Uri {
        self.0.uri()
    }

    pub fn get_header(&self, n: &str) -> Option<&str> {
        self.0.headers().get(n).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        self.0.body()
    }

    pub fn inner(&self) -> &Request<Bytes> {
        &self.0
    }

    /// True when both handles refer to the same request.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl From<Request<Bytes>> for OriginRequest {
    fn from(req: Request<Bytes>) -> Self {
        OriginRequest::new(req)
    }
}

impl fmt::Debug for OriginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OriginRequest({} {})", self.0.method(), self.0.uri())
    }
}

/// Shared handle to the outbound response.
#[derive(Clone)]
pub struct OriginResponse(Arc<Response<Bytes>>);

impl OriginResponse {
    pub fn new(resp: Response<Bytes>) -> Self {
        OriginResponse(Arc::new(resp))
    }

    /// Plain-text response with `Connection: close`, for filters that short-circuit.
    pub fn error(c: u16, m: &str) -> Self {
        let mut resp = Response::new(Bytes::copy_from_slice(m.as_bytes()));
        *resp.status_mut() = StatusCode::from_u16(c).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let h = resp.headers_mut();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        h.insert(CONTENT_LENGTH, HeaderValue::from(m.len()));
        h.insert(CONNECTION, HeaderValue::from_static("close"));
        OriginResponse::new(resp)
    }

    pub fn status(&self) -> StatusCode {
        self.0.status()
    }

    pub fn get_header(&self, n: &str) -> Option<&str> {
        self.0.headers().get(n).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        self.0.body()
    }

    pub fn inner(&self) -> &Response<Bytes> {
        &self.0
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl From<Response<Bytes>> for OriginResponse {
    fn from(resp: Response<Bytes>) -> Self {
        OriginResponse::new(resp)
    }
}

impl fmt::Debug for OriginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OriginResponse({})", self.0.status())
    }
}
