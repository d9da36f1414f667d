use body_parsers::{Error, Parsers, ParsersConfig, Request, body::Body};
use http::{HeaderValue, Method, header::CONTENT_TYPE};
use serde::Deserialize;

const CONFIG: &str = r#"{
    "parsers": ["urlencoded", "multipart", ["json", {"length": 1024}]],
    "pass": ["text/*"],
    "read_timeout": 5000
}"#;

#[derive(Debug, Deserialize)]
struct Signup {
    id: String,
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    name: String,
    email: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let parsers = Parsers::from_config(ParsersConfig::from_json(CONFIG)?)?;

    let mut req = request(
        Method::POST,
        "/users/42?source=web",
        "application/x-www-form-urlencoded",
        "user[name]=alice&user[email]=alice%40example.com",
    );
    req.path_params_mut().insert("id".into(), "42".into());
    handle(&parsers, &mut req).await;
    if req.params().fetched().is_some() {
        let signup: Signup = req.params_as()?;
        println!("  typed: {signup:?}");
    }

    let mut req = request(Method::PATCH, "/users/42", "application/json", r#"{"active": true}"#);
    handle(&parsers, &mut req).await;

    let mut req = request(Method::POST, "/notes", "text/markdown", "# hello");
    handle(&parsers, &mut req).await;

    let mut req = request(Method::POST, "/upload", "image/png", "\u{89}PNG");
    handle(&parsers, &mut req).await;

    let big = format!(r#"{{"data": "{}"}}"#, "x".repeat(2048));
    let mut req = request(Method::PUT, "/users/42", "application/json", big);
    handle(&parsers, &mut req).await;

    Ok(())
}

fn request(method: Method, uri: &str, content_type: &str, body: impl Into<Body>) -> Request {
    let content_type = HeaderValue::from_str(content_type).expect("valid content type");
    Request::new(method, uri.parse().expect("valid uri"))
        .with_header(CONTENT_TYPE, content_type)
        .with_body(body)
}

async fn handle(parsers: &Parsers, req: &mut Request) {
    println!("> {} {}", req.method(), req.uri());
    match parsers.call(req).await {
        Ok(()) => println!("  params: {}", to_json(req)),
        Err(err) => println!("  {}: {err}", status(&err)),
    }
}

fn to_json(req: &Request) -> String {
    serde_json::to_string(&req.params().fetched()).unwrap_or_default()
}

fn status(err: &Error) -> u16 {
    err.status().as_u16()
}
