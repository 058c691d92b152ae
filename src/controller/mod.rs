//! Base web controller: views, JSON/HTML responses, redirects, aborts and request input.
//!
//! A `WebController` is built per request (it is an axum extractor) and owns a
//! snapshot of the request: headers, merged query/form/cookie parameters and the
//! raw body. Response helpers return axum responses; `redirect` and `abort`
//! return a [`Halt`], which handlers propagate with `?` or `return Err(..)`.

mod input;

pub use input::Inputs;

use crate::config::ViewConfig;
use crate::error::{AppError, RenderError};
use crate::view::{self, escape_value};
use axum::body::Bytes;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Reason phrase used by `abort` for the status codes it knows; empty for the rest.
pub fn reason_phrase(code: StatusCode) -> &'static str {
    match code.as_u16() {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// A finished response that ends request handling.
#[derive(Debug)]
pub struct Halt(Response);

impl Halt {
    pub fn status(&self) -> StatusCode {
        self.0.status()
    }
}

impl IntoResponse for Halt {
    fn into_response(self) -> Response {
        self.0
    }
}

impl From<AppError> for Halt {
    fn from(e: AppError) -> Self {
        Halt(e.into_response())
    }
}

/// Handler result: a normal response, or a halt decided somewhere down the call stack.
pub type Reply = Result<Response, Halt>;

pub struct WebController {
    views: Arc<ViewConfig>,
    headers: HeaderMap,
    params: Map<String, Value>,
    body: Bytes,
    request_input: OnceLock<Inputs>,
}

impl WebController {
    /// Snapshot a request. Form bodies count as parameters only when sent as
    /// `application/x-www-form-urlencoded`.
    pub fn from_parts(views: Arc<ViewConfig>, parts: &Parts, body: Bytes) -> Self {
        let mut params = parts
            .uri
            .query()
            .map(input::parse_params)
            .unwrap_or_default();
        let is_form = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false);
        if is_form {
            params.extend(input::parse_params(&String::from_utf8_lossy(&body)));
        }
        params.extend(input::parse_cookies(
            parts
                .headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        ));
        WebController {
            views,
            headers: parts.headers.clone(),
            params,
            body,
            request_input: OnceLock::new(),
        }
    }

    pub fn views(&self) -> &ViewConfig {
        &self.views
    }

    /// Override the layout for this controller; `None` renders views unwrapped.
    pub fn set_layout(&mut self, layout: Option<&str>) {
        let views = Arc::make_mut(&mut self.views);
        views.layout = layout.filter(|l| !l.is_empty()).map(str::to_string);
    }

    /// Render `<view_path>/<name>.html`, wrapped in the layout when one is configured,
    /// as an HTML 200 response. `data` is escaped, `raw` is not.
    pub async fn view<D, R>(&self, name: &str, data: &D, raw: &R) -> Result<Response, AppError>
    where
        D: Serialize + ?Sized,
        R: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data).map_err(RenderError::from)?;
        let mut raw = match serde_json::to_value(raw).map_err(RenderError::from)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(RenderError::Context(view::type_name(&other)).into()),
        };
        let page_raw = Value::Object(raw.clone());
        let mut output = self.render(&self.views.view_file(name), &data, &page_raw).await?;

        if let Some(layout) = self.views.layout_file() {
            raw.insert("content".into(), Value::String(output));
            output = self.render(&layout, &Value::Null, &Value::Object(raw)).await?;
        }

        Ok(self.html(output, StatusCode::OK))
    }

    /// Serialize `output` as JSON with the given status.
    pub fn json<T: Serialize + ?Sized>(&self, output: &T, code: StatusCode) -> Response {
        (code, Json(output)).into_response()
    }

    /// Redirect to `url` and stop.
    pub fn redirect(&self, url: &str) -> Halt {
        tracing::debug!(location = %url, "redirect");
        Halt((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
    }

    /// Stop with `code`. JSON requests get the reason phrase as a JSON string; others get
    /// `html` (or an empty body).
    pub fn abort(&self, code: StatusCode, html: Option<&str>) -> Halt {
        let message = reason_phrase(code);
        tracing::debug!(status = code.as_u16(), "abort");
        if self.request_is_json() {
            return Halt(self.json(message, code));
        }
        Halt(self.html(html.unwrap_or_default().to_string(), code))
    }

    pub fn html(&self, output: impl Into<String>, code: StatusCode) -> Response {
        let body: String = output.into();
        (code, [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)], body).into_response()
    }

    /// Render one template file with escaped `data` and unescaped `raw` in scope.
    pub async fn render(&self, file: &Path, data: &Value, raw: &Value) -> Result<String, AppError> {
        Ok(view::render_file(file, data, raw).await?)
    }

    /// True when the Accept header is exactly `application/json`.
    pub fn request_is_json(&self) -> bool {
        self.header_line("Accept", None) == Some(JSON_CONTENT_TYPE)
    }

    /// Value of a request header, or `default` when it is absent or not visible ASCII.
    pub fn header_line<'a>(&'a self, key: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .or(default)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// HTML-escape every string inside `data`, keeping its shape.
    pub fn safe<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value, AppError> {
        let value = serde_json::to_value(data).map_err(RenderError::from)?;
        Ok(escape_value(&value))
    }

    /// Escape a record field-wise and return it as the same type.
    pub fn safe_record<T: Serialize + DeserializeOwned>(&self, record: &T) -> Result<T, AppError> {
        let escaped = self.safe(record)?;
        Ok(serde_json::from_value(escaped).map_err(RenderError::from)?)
    }

    /// One value from the request input. The input is normalized once per controller.
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.request_input.get_or_init(|| self.inputs()).get(key)
    }

    /// Query/form/cookie parameters if there are any; else the JSON body for JSON
    /// requests; else the raw body text.
    pub fn inputs(&self) -> Inputs {
        if !self.params.is_empty() {
            return Inputs::Params(self.params.clone());
        }
        if self.request_is_json() {
            let decoded = serde_json::from_slice(&self.body).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "request body is not valid JSON");
                Value::Null
            });
            return Inputs::Json(decoded);
        }
        Inputs::Raw(String::from_utf8_lossy(&self.body).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    fn controller(req: Request<&'static str>) -> WebController {
        let (parts, body) = req.into_parts();
        WebController::from_parts(
            Arc::new(ViewConfig::default()),
            &parts,
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[test]
    fn reason_phrases() {
        assert_eq!(reason_phrase(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(reason_phrase(StatusCode::UNPROCESSABLE_ENTITY), "Unprocessable Entity");
        assert_eq!(reason_phrase(StatusCode::IM_A_TEAPOT), "");
    }

    #[test]
    fn accept_must_match_exactly() {
        let c = controller(
            Request::builder()
                .header("Accept", "application/json")
                .body("")
                .unwrap(),
        );
        assert!(c.request_is_json());
        let c = controller(
            Request::builder()
                .header("Accept", "application/json, text/html")
                .body("")
                .unwrap(),
        );
        assert!(!c.request_is_json());
    }

    #[test]
    fn header_line_falls_back_to_default() {
        let c = controller(Request::builder().header("X-Trace", "t1").body("").unwrap());
        assert_eq!(c.header_line("x-trace", None), Some("t1"));
        assert_eq!(c.header_line("X-Missing", Some("none")), Some("none"));
        assert_eq!(c.header_line("X-Missing", None), None);
    }

    #[test]
    fn params_merge_query_form_and_cookies() {
        let c = controller(
            Request::builder()
                .uri("/posts?page=2&q=rust")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("Cookie", "q=cookie")
                .body("title=Hi&tags[]=a&tags[]=b")
                .unwrap(),
        );
        assert_eq!(
            c.inputs(),
            Inputs::Params(
                json!({"page": "2", "q": "cookie", "title": "Hi", "tags": ["a", "b"]})
                    .as_object()
                    .cloned()
                    .unwrap()
            )
        );
        assert_eq!(c.input("title"), Some(&json!("Hi")));
    }

    #[test]
    fn json_body_used_without_params() {
        let c = controller(
            Request::builder()
                .header("Accept", "application/json")
                .body(r#"{"title": "From JSON"}"#)
                .unwrap(),
        );
        assert_eq!(c.inputs(), Inputs::Json(json!({"title": "From JSON"})));
        assert_eq!(c.input("title"), Some(&json!("From JSON")));
    }

    #[test]
    fn raw_body_otherwise() {
        let c = controller(Request::builder().body("just text").unwrap());
        assert_eq!(c.inputs(), Inputs::Raw("just text".into()));
        assert_eq!(c.input("anything"), None);
    }

    #[tokio::test]
    async fn view_rejects_non_object_raw_before_rendering() {
        let c = controller(Request::builder().body("").unwrap());
        // The view file does not exist; the raw check must fail first.
        let err = c.view("missing", &json!({}), &json!(["footer"])).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Render(RenderError::Context("array"))
        ));
    }

    #[test]
    fn safe_record_escapes_fields() {
        #[derive(Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Comment {
            author: String,
            votes: i64,
        }
        let c = controller(Request::builder().body("").unwrap());
        let escaped = c
            .safe_record(&Comment {
                author: "<script>".into(),
                votes: 3,
            })
            .unwrap();
        assert_eq!(
            escaped,
            Comment {
                author: "&lt;script&gt;".into(),
                votes: 3
            }
        );
    }
}
