use actix_web::{App, HttpRequest, HttpResponse, HttpServer, http::StatusCode, web};
use std::collections::HashMap;
use std::sync::Arc;

/// Replaced in every body with the server's own `http://host:port`.
pub const BASE_PLACEHOLDER: &str = "{base}";
/// Replaced in every body with the `host:port` the request was addressed to.
#[allow(dead_code)]
pub const HOST_PLACEHOLDER: &str = "{host}";

#[derive(Clone)]
struct Route {
    status: u16,
    content_type: &'static str,
    body: String,
    location: Option<String>,
}

/// A tiny website served from a fixed route table. Unknown paths are 404.
#[derive(Clone, Default)]
pub struct TestSite {
    routes: HashMap<String, Route>,
}

#[allow(dead_code)]
impl TestSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, path: &str, html: impl Into<String>) -> Self {
        self.route(path, 200, "text/html; charset=utf-8", html)
    }

    pub fn xml(self, path: &str, xml: impl Into<String>) -> Self {
        self.route(path, 200, "application/xml", xml)
    }

    pub fn status(self, path: &str, status: u16) -> Self {
        self.route(path, status, "text/plain", "blocked")
    }

    /// Answers `path` with a 301 to `location`.
    pub fn redirect(mut self, path: &str, location: &str) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                status: 301,
                content_type: "text/plain",
                body: String::new(),
                location: Some(location.to_string()),
            },
        );
        self
    }

    pub fn route(
        mut self,
        path: &str,
        status: u16,
        content_type: &'static str,
        body: impl Into<String>,
    ) -> Self {
        self.routes.insert(
            path.to_string(),
            Route {
                status,
                content_type,
                body: body.into(),
                location: None,
            },
        );
        self
    }

    /// Serves the site on an ephemeral port and returns its base URL.
    pub async fn serve(self) -> String {
        let routes = Arc::new(self.routes);
        let http_server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::from(routes.clone()))
                .default_service(web::to(respond))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Failed to bind test server");

        let addr = http_server
            .addrs()
            .first()
            .cloned()
            .expect("No address bound");
        let url = format!("http://{}", addr);

        let app_server = http_server.run();

        tokio::spawn(async move {
            if let Err(e) = app_server.await {
                eprintln!("Test server error: {}", e);
            }
        });

        url
    }
}

async fn respond(req: HttpRequest, routes: web::Data<HashMap<String, Route>>) -> HttpResponse {
    let Some(route) = routes.get(req.path()) else {
        return HttpResponse::NotFound().body("Not Found");
    };

    let host = req.connection_info().host().to_string();
    let base = format!("http://{host}");
    let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = HttpResponse::build(status);
    if let Some(location) = &route.location {
        response.insert_header(("Location", location.as_str()));
    }
    response.content_type(route.content_type).body(
        route
            .body
            .replace(BASE_PLACEHOLDER, &base)
            .replace(HOST_PLACEHOLDER, &host),
    )
}

/// A regular content page with enough body text to pass the crawler's filter.
#[allow(dead_code)]
pub fn content_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">{href}</a> "#))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <meta name="description" content="{title} description">
</head>
<body>
    <nav>{anchors}</nav>
    <main>
        <h1>{title}</h1>
        <p>We design and build well-made things for people who care about craft.
        Our team has shipped products to customers in more than forty countries
        and we keep learning from every one of them.</p>
    </main>
</body>
</html>"#
    )
}

/// A sitemap listing `paths` under the server's own base URL.
#[allow(dead_code)]
pub fn sitemap(paths: &[&str]) -> String {
    let urls: String = paths
        .iter()
        .map(|path| format!("<url><loc>{BASE_PLACEHOLDER}{path}</loc></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{urls}</urlset>"#
    )
}

#[allow(dead_code)]
pub const CHALLENGE_PAGE: &str = r#"<html>
<head><title>Just a moment...</title></head>
<body><p>Checking your browser before accessing the site.</p></body>
</html>"#;
