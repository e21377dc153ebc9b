//! Integration tests for robots.txt fetching against a mock server.

use harvester_core::{HttpClient, PolicyResolver, PolicyRules};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver() -> PolicyResolver {
    PolicyResolver::new(HttpClient::new())
}

#[tokio::test]
async fn test_fetch_policy_parses_served_file() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let body = format!(
        "User-agent: *\nDisallow: /checkout\nCrawl-delay: 1\nSitemap: {}/sitemap_index.xml\n",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let rules = resolver().fetch_policy(&Url::parse(&server.uri())?).await;

    assert_eq!(rules.disallowed_paths(), ["/checkout"]);
    assert_eq!(
        rules.sitemaps(),
        [format!("{}/sitemap_index.xml", server.uri())]
    );
    assert!((rules.crawl_delay() - 1.0).abs() < f64::EPSILON);
    assert!(!rules.is_allowed(&format!("{}/checkout/cart", server.uri())));
    Ok(())
}

#[tokio::test]
async fn test_fetch_policy_resolves_from_site_root() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /x\n"))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/en/shop/", server.uri()))?;
    let rules = resolver().fetch_policy(&base).await;
    assert_eq!(rules.disallowed_paths(), ["/x"]);
    Ok(())
}

#[tokio::test]
async fn test_fetch_policy_missing_file_is_unrestricted() -> Result<(), Box<dyn std::error::Error>>
{
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let rules = resolver().fetch_policy(&Url::parse(&server.uri())?).await;
    assert_eq!(rules, PolicyRules::unrestricted());
    Ok(())
}

#[tokio::test]
async fn test_fetch_policy_server_error_is_unrestricted() -> Result<(), Box<dyn std::error::Error>>
{
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Disallow: /"))
        .expect(1)
        .mount(&server)
        .await;

    let rules = resolver().fetch_policy(&Url::parse(&server.uri())?).await;
    assert!(rules.is_allowed("/anything"));
    assert!(rules.sitemaps().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fetch_policy_unreachable_host_is_unrestricted() -> Result<(), Box<dyn std::error::Error>>
{
    // Port 1 is reserved and never listening.
    let rules = resolver()
        .fetch_policy(&Url::parse("http://127.0.0.1:1")?)
        .await;
    assert_eq!(rules, PolicyRules::unrestricted());
    Ok(())
}
