//! Admin request parameters.
//!
//! Values come from the query string. On POST, fields of an url-encoded or
//! multipart body override the query values of the same name. `ack` is only
//! ever read from the query string.

use axum::extract::{FromRequest, Multipart, Query, Request};
use axum::http::{header, HeaderMap, Method};
use axum::Form;
use serde::Deserialize;

use crate::dashboard::envelope::ApiResponse;

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminParams {
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub consumer: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub ack: String,
}

impl AdminParams {
    /// Sets a body field. Unknown names and `ack` are ignored.
    fn set_body_field(&mut self, name: &str, value: String) {
        match name {
            "stream" => self.stream = value,
            "consumer" => self.consumer = value,
            "subject" => self.subject = value,
            "data" => self.data = value,
            _ => {}
        }
    }

    fn merge_body(mut self, body: AdminParams) -> Self {
        let fields = [
            ("stream", body.stream),
            ("consumer", body.consumer),
            ("subject", body.subject),
            ("data", body.data),
        ];
        for (name, value) in fields {
            if !value.is_empty() {
                self.set_body_field(name, value);
            }
        }
        self
    }
}

enum BodyKind {
    None,
    UrlEncoded,
    Multipart,
}

impl BodyKind {
    fn of(method: &Method, headers: &HeaderMap) -> Self {
        if method != Method::POST {
            return BodyKind::None;
        }
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            BodyKind::Multipart
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            BodyKind::UrlEncoded
        } else {
            BodyKind::None
        }
    }
}

/// Extractor for [`AdminParams`]. A malformed query or body is answered with
/// the error envelope before the handler runs.
pub struct AdminForm(pub AdminParams);

impl<S> FromRequest<S> for AdminForm
where
    S: Send + Sync,
{
    type Rejection = ApiResponse<()>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<AdminParams>::try_from_uri(req.uri()).map_err(parse_error)?;

        let body = match BodyKind::of(req.method(), req.headers()) {
            BodyKind::None => return Ok(AdminForm(query)),
            BodyKind::UrlEncoded => {
                let Form(body) = Form::<AdminParams>::from_request(req, state)
                    .await
                    .map_err(parse_error)?;
                body
            }
            BodyKind::Multipart => {
                let multipart = Multipart::from_request(req, state).await.map_err(parse_error)?;
                read_multipart(multipart).await?
            }
        };

        Ok(AdminForm(query.merge_body(body)))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<AdminParams, ApiResponse<()>> {
    let mut params = AdminParams::default();
    while let Some(field) = multipart.next_field().await.map_err(parse_error)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = field.text().await.map_err(parse_error)?;
        params.set_body_field(&name, value);
    }
    Ok(params)
}

fn parse_error(err: impl std::fmt::Display) -> ApiResponse<()> {
    ApiResponse::error(format!("parsing form data: {}", err))
}
