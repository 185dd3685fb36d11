use bytes::Bytes;
use rebound::{Response, Url};

#[allow(unused)]
pub const PROBLEM_JSON: &str = "application/problem+json";

/// A response without headers.
#[allow(unused)]
pub fn status(status: u16) -> Response {
    response(status, &[], "")
}

pub fn response(status: u16, headers: &[(&str, &str)], body: &'static str) -> Response {
    let mut builder = http::Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    Response::from(builder.body(Bytes::from_static(body.as_bytes())).unwrap())
}

#[allow(unused)]
pub fn json(status: u16, body: &'static str) -> Response {
    response(status, &[("content-type", "application/json")], body)
}

#[allow(unused)]
pub fn problem(status: u16, body: &'static str) -> Response {
    response(status, &[("content-type", PROBLEM_JSON)], body)
}

#[allow(unused)]
pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}
