//! Body conversion
//!
//! Routes convert a response into the type they were declared with through
//! [`FromResponse`]. The target type acts as the type descriptor: the same
//! response converted into the same type always yields the same result.

use std::io;
#[cfg(feature = "json")]
use std::{error::Error as StdError, fmt};

use bytes::Bytes;
use http::HeaderMap;
#[cfg(feature = "json")]
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::Response;

/// Converts a whole response into `Self`.
pub trait FromResponse: Sized + Send + 'static {
    /// Performs the conversion, consuming the response's body.
    fn from_response(response: Response) -> crate::Result<Self>;
}

impl FromResponse for Response {
    fn from_response(response: Response) -> crate::Result<Self> {
        Ok(response)
    }
}

impl FromResponse for Bytes {
    fn from_response(response: Response) -> crate::Result<Self> {
        response.bytes()
    }
}

impl FromResponse for String {
    fn from_response(response: Response) -> crate::Result<Self> {
        response.text()
    }
}

impl FromResponse for HeaderMap {
    fn from_response(response: Response) -> crate::Result<Self> {
        let (parts, _) = response.into_parts();
        Ok(parts.headers)
    }
}

/// The body as the message of an `io::Error`.
///
/// Lets [`route::propagate`](crate::route::propagate) raise a plain I/O
/// failure, which then becomes the proximate cause itself.
impl FromResponse for io::Error {
    fn from_response(response: Response) -> crate::Result<Self> {
        Ok(io::Error::other(response.text()?))
    }
}

/// A JSON body deserialized into `T`.
///
/// # Example
///
/// ```
/// use rebound::{convert::Json, navigator::status, on, route, RoutingTree, StatusCode};
///
/// #[derive(serde::Deserialize)]
/// struct Account {
///     id: String,
/// }
///
/// let tree = RoutingTree::new(status(), vec![
///     on(StatusCode::OK).call(route::call(|Json(account): Json<Account>| {
///         println!("account {}", account.id);
///     })),
/// ])
/// .unwrap();
/// # drop(tree);
/// ```
#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

#[cfg(feature = "json")]
impl<T> FromResponse for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn from_response(response: Response) -> crate::Result<Self> {
        response.json().map(Json)
    }
}

/// A problem detail document as described by RFC 7807.
///
/// Implements `std::error::Error`, so it can be raised with
/// [`route::propagate`](crate::route::propagate).
#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instance: Option<String>,
    #[serde(flatten)]
    extensions: serde_json::Map<String, serde_json::Value>,
}

#[cfg(feature = "json")]
impl Problem {
    /// The problem type; `about:blank` when the document has none.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("about:blank")
    }

    /// A short summary of the problem type.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The status code the server generated for this occurrence.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// An explanation specific to this occurrence.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// A reference identifying this occurrence.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// An extension member.
    pub fn extension(&self, name: &str) -> Option<&serde_json::Value> {
        self.extensions.get(name)
    }
}

#[cfg(feature = "json")]
impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.title.as_deref().unwrap_or_else(|| self.kind()))?;

        if let Some(status) = self.status {
            write!(f, " ({status})")?;
        }

        if let Some(ref detail) = self.detail {
            write!(f, ": {detail}")?;
        }

        Ok(())
    }
}

#[cfg(feature = "json")]
impl StdError for Problem {}

#[cfg(feature = "json")]
impl FromResponse for Problem {
    fn from_response(response: Response) -> crate::Result<Self> {
        response.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &'static str) -> Response {
        Response::from(
            http::Response::builder()
                .header("content-type", "application/problem+json")
                .header("etag", "\"1\"")
                .body(body)
                .unwrap(),
        )
    }

    #[test]
    fn test_string_and_bytes() {
        assert_eq!(String::from_response(response("hello")).unwrap(), "hello");
        assert_eq!(
            Bytes::from_response(response("hello")).unwrap(),
            Bytes::from_static(b"hello")
        );
        // an empty body is a valid empty string
        assert_eq!(String::from_response(response("")).unwrap(), "");
    }

    #[test]
    fn test_headers() {
        let headers = HeaderMap::from_response(response("ignored")).unwrap();
        assert_eq!(headers["etag"], "\"1\"");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_problem() {
        let problem = Problem::from_response(response(
            r#"{"type":"https://example.org/out-of-stock","title":"Out of Stock","status":422,"detail":"Item B00027Y5QG is no longer available","product":"B00027Y5QG"}"#,
        ))
        .unwrap();

        assert_eq!(problem.kind(), "https://example.org/out-of-stock");
        assert_eq!(problem.title(), Some("Out of Stock"));
        assert_eq!(problem.status(), Some(422));
        assert_eq!(
            problem.extension("product"),
            Some(&serde_json::Value::from("B00027Y5QG"))
        );
        assert_eq!(
            problem.to_string(),
            "Out of Stock (422): Item B00027Y5QG is no longer available"
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_problem_defaults() {
        let problem = Problem::from_response(response("{}")).unwrap();
        assert_eq!(problem.kind(), "about:blank");
        assert_eq!(problem.to_string(), "about:blank");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_empty_body() {
        let err = Json::<serde_json::Value>::from_response(response("")).unwrap_err();
        assert!(err.is_empty_body());
    }
}
