mod engine;
mod server;

use brandscout::crawler::{COMMON_PATHS, Crawler, CrawlerConfig};
use brandscout::fetcher::{HttpConfig, HttpFetcher};
use brandscout::models::{CrawlResult, PageType};
use brandscout::renderer::RenderedFetcher;
use engine::{LONG_TEXT, ScriptedEngine, fast_options, rendered};
use server::{CHALLENGE_PAGE, HOST_PLACEHOLDER, TestSite, content_page, sitemap};

const SPA_SHELL: &str =
    r#"<html><head><title>Acme</title></head><body><div id="root"></div></body></html>"#;

fn config(max_pages: usize, concurrency: usize) -> CrawlerConfig {
    CrawlerConfig {
        max_pages,
        concurrency,
        ..Default::default()
    }
}

fn http() -> HttpFetcher {
    HttpFetcher::new(&HttpConfig {
        timeout_secs: 5,
        requests_per_second: None,
    })
    .expect("Failed to build HTTP fetcher")
}

async fn crawl(base_url: &str, config: CrawlerConfig) -> CrawlResult {
    let http = http();
    let mut crawler = Crawler::new(base_url, config, &http, None).expect("Failed to create crawler");
    crawler.crawl().await
}

fn paths(base_url: &str, result: &CrawlResult) -> Vec<String> {
    result
        .pages
        .iter()
        .map(|page| page.url.trim_start_matches(base_url).to_string())
        .collect()
}

#[tokio::test]
async fn test_sitemap_seeding_orders_by_page_type() {
    let mut site = TestSite::new().xml(
        "/sitemap.xml",
        sitemap(&[
            "/", "/careers", "/about", "/contact", "/products", "/blog", "/team", "/pricing",
        ]),
    );
    for (path, title) in [
        ("/", "Acme | Home"),
        ("/careers", "Careers"),
        ("/about", "About Acme"),
        ("/contact", "Contact"),
        ("/products", "Products"),
        ("/blog", "Blog"),
        ("/team", "Our Team"),
        ("/pricing", "Pricing"),
    ] {
        site = site.page(path, content_page(title, &[]));
    }
    let base_url = site.serve().await;

    let result = crawl(&base_url, config(5, 5)).await;

    assert_eq!(
        paths(&base_url, &result),
        vec!["/", "/about", "/team", "/products", "/pricing"]
    );
    assert_eq!(result.pages[0].page_type, PageType::Homepage);
    assert_eq!(result.pages[0].title, "Acme | Home");
    assert_eq!(result.visited_urls.len(), 5);
    assert!(
        result
            .discovered_but_unvisited
            .contains(&format!("{base_url}/blog"))
    );
}

#[tokio::test]
async fn test_common_paths_without_sitemap() {
    let base_url = TestSite::new()
        .page("/", content_page("Acme", &[]))
        .page("/about", content_page("About Acme", &[]))
        .page("/services", content_page("Services", &[]))
        .page("/blog", content_page("Blog", &[]))
        .serve()
        .await;

    let result = crawl(&base_url, config(5, 5)).await;

    assert_eq!(
        paths(&base_url, &result),
        vec!["/", "/about", "/services", "/blog"]
    );
    let types: Vec<_> = result.pages.iter().map(|p| p.page_type).collect();
    assert_eq!(
        types,
        vec![
            PageType::Homepage,
            PageType::About,
            PageType::Products,
            PageType::Blog
        ]
    );
    for path in COMMON_PATHS {
        assert!(result.visited_urls.contains(&format!("{base_url}{path}")));
    }
}

#[tokio::test]
async fn test_max_pages_is_a_hard_bound() {
    let links = ["/a", "/b", "/c", "/d", "/e", "/f"];
    let mut site = TestSite::new().page("/", content_page("Acme", &links));
    for link in links {
        site = site.page(link, content_page("Page", &[]));
    }
    let base_url = site.serve().await;

    let result = crawl(&base_url, config(3, 5)).await;

    assert_eq!(result.pages.len(), 3);
    assert_eq!(paths(&base_url, &result)[0], "/");
}

#[tokio::test]
async fn test_high_value_links_jump_the_queue() {
    let base_url = TestSite::new()
        .page("/", content_page("Acme", &["/random", "/team"]))
        .page("/random", content_page("Random", &[]))
        .page("/team", content_page("Our Team", &[]))
        .serve()
        .await;

    let result = crawl(&base_url, config(2, 1)).await;

    assert_eq!(paths(&base_url, &result), vec!["/", "/team"]);
    assert!(
        result
            .discovered_but_unvisited
            .contains(&format!("{base_url}/random"))
    );
}

#[tokio::test]
async fn test_acceptance_filter() {
    let base_url = TestSite::new()
        .page(
            "/",
            "<html><head><title>Acme</title></head><body><p>Hi</p></body></html>",
        )
        .page(
            "/about",
            format!("<html><head></head><body><p>{LONG_TEXT}</p></body></html>"),
        )
        .page("/products", content_page("Products", &[]))
        .serve()
        .await;

    let result = crawl(&base_url, config(5, 5)).await;

    assert_eq!(paths(&base_url, &result), vec!["/products"]);
    assert!(result.visited_urls.contains(&format!("{base_url}/")));
}

#[tokio::test]
async fn test_protection_page_is_discarded_without_browser() {
    let base_url = TestSite::new()
        .page("/", CHALLENGE_PAGE)
        .page("/about", content_page("About Acme", &[]))
        .serve()
        .await;

    let result = crawl(&base_url, config(5, 5)).await;

    assert_eq!(paths(&base_url, &result), vec!["/about"]);
}

#[tokio::test]
async fn test_empty_site_yields_empty_result() {
    let base_url = TestSite::new().serve().await;

    let result = crawl(&base_url, config(5, 5)).await;

    assert!(result.pages.is_empty());
    assert!(result.visited_urls.contains(&format!("{base_url}/")));
}

#[tokio::test]
async fn test_protection_page_recovered_by_browser() {
    let base_url = TestSite::new()
        .page("/", CHALLENGE_PAGE)
        .page("/about", content_page("About Acme", &[]))
        .serve()
        .await;
    let home = format!("{base_url}/");
    let engine = ScriptedEngine::new().page(&home, rendered("Acme | Home", LONG_TEXT));
    let log = engine.log();
    let renderer = RenderedFetcher::spawn(engine.boxed(), fast_options());

    let http = http();
    let result = {
        let mut crawler = Crawler::new(&base_url, config(2, 5), &http, Some(&renderer)).unwrap();
        crawler.crawl().await
    };
    renderer.shutdown().await;

    assert_eq!(paths(&base_url, &result), vec!["/", "/about"]);
    assert_eq!(result.pages[0].title, "Acme | Home");
    assert_eq!(log.lock().unwrap().navigated, vec![home]);
}

#[tokio::test]
async fn test_blocked_batch_falls_back_to_browser() {
    let base_url = TestSite::new()
        .status("/", 403)
        .status("/about", 403)
        .status("/products", 403)
        .serve()
        .await;
    let urls: Vec<String> = ["/", "/about", "/products"]
        .iter()
        .map(|path| format!("{base_url}{path}"))
        .collect();
    let engine = ScriptedEngine::new()
        .page(&urls[0], rendered("Acme | Home", LONG_TEXT))
        .page(&urls[1], rendered("About Acme", LONG_TEXT))
        .page(&urls[2], rendered("Products", LONG_TEXT));
    let log = engine.log();
    let renderer = RenderedFetcher::spawn(engine.boxed(), fast_options());

    let http = http();
    let result = {
        let mut crawler = Crawler::new(&base_url, config(3, 3), &http, Some(&renderer)).unwrap();
        crawler.crawl().await
    };
    renderer.shutdown().await;

    assert_eq!(
        paths(&base_url, &result),
        vec!["/", "/about", "/products"]
    );
    assert_eq!(log.lock().unwrap().navigated, urls);
    assert!(log.lock().unwrap().closed);
}

#[tokio::test]
async fn test_seeds_are_rendered_when_http_accepts_nothing() {
    let mut site = TestSite::new().page("/", SPA_SHELL);
    for path in COMMON_PATHS {
        site = site.page(path, SPA_SHELL);
    }
    let base_url = site.serve().await;
    let home = format!("{base_url}/");
    let about = format!("{base_url}/about");
    let engine = ScriptedEngine::new()
        .page(&home, rendered("Acme | Home", LONG_TEXT))
        .page(&about, rendered("About Acme", LONG_TEXT));
    let log = engine.log();
    let renderer = RenderedFetcher::spawn(engine.boxed(), fast_options());

    let http = http();
    let result = {
        let mut crawler = Crawler::new(&base_url, config(2, 5), &http, Some(&renderer)).unwrap();
        crawler.crawl().await
    };
    renderer.shutdown().await;

    assert_eq!(paths(&base_url, &result), vec!["/", "/about"]);
    assert_eq!(log.lock().unwrap().navigated, vec![home, about]);
}

#[tokio::test]
async fn test_redirect_aliases_are_accepted_once() {
    let base_url = TestSite::new()
        .page("/", content_page("Acme | Home", &[]))
        .page("/about", content_page("About Acme", &[]))
        .redirect("/about-us", "/about")
        .redirect("/products", "/products/")
        .page("/products/", content_page("Products", &["widget"]))
        .page("/products/widget", content_page("Rocket Widget", &[]))
        .serve()
        .await;

    let result = crawl(&base_url, config(5, 5)).await;

    assert_eq!(
        paths(&base_url, &result),
        vec!["/", "/about", "/products", "/products/widget"]
    );
    let about_pages = result
        .pages
        .iter()
        .filter(|page| page.title == "About Acme")
        .count();
    assert_eq!(about_pages, 1);
    assert!(result.visited_urls.contains(&format!("{base_url}/about-us")));
}

#[tokio::test]
async fn test_www_sitemap_entries_share_the_seed_host() {
    let sitemap_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
<url><loc>http://www.{HOST_PLACEHOLDER}/</loc></url>
<url><loc>http://{HOST_PLACEHOLDER}/about</loc></url>
</urlset>"#
    );
    let served = TestSite::new()
        .xml("/sitemap.xml", sitemap_xml)
        .page("/", content_page("Acme | Home", &[]))
        .page("/about", content_page("About Acme", &[]))
        .serve()
        .await;
    let base_url = served.replace("127.0.0.1", "localhost");

    let result = crawl(&base_url, config(5, 5)).await;

    assert_eq!(paths(&base_url, &result), vec!["/", "/about"]);
    assert_eq!(result.visited_urls.len(), 2);
    assert!(result.visited_urls.iter().all(|url| !url.contains("www.")));
}

#[tokio::test]
async fn test_browser_crash_disables_rendering_for_the_run() {
    let base_url = TestSite::new()
        .page("/", CHALLENGE_PAGE)
        .page("/about", CHALLENGE_PAGE)
        .page("/products", content_page("Products", &[]))
        .serve()
        .await;
    let home = format!("{base_url}/");
    let about = format!("{base_url}/about");
    let engine = ScriptedEngine::new()
        .crash_on(&home)
        .page(&about, rendered("About Acme", LONG_TEXT));
    let log = engine.log();
    let renderer = RenderedFetcher::spawn(engine.boxed(), fast_options());

    let http = http();
    let result = {
        let mut crawler = Crawler::new(&base_url, config(5, 5), &http, Some(&renderer)).unwrap();
        crawler.crawl().await
    };
    renderer.shutdown().await;

    assert_eq!(paths(&base_url, &result), vec!["/products"]);
    assert_eq!(
        log.lock().unwrap().navigated,
        vec![home],
        "No navigation should follow the crash"
    );
}
