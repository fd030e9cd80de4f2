//! Common test utilities

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing page linking to `hrefs` with the directory anchors
pub fn listing_page(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<div class="map-list-item"><a class="ga-link" href="{href}">Link</a></div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div class="map-list">{items}</div></body></html>"#)
}

/// Store page with metadata, one desktop hours row and a JSON-LD location
pub fn store_page(state: &str, city: &str, address: &str, store_id: &str) -> String {
    format!(
        r##"<html>
<head>
    <meta name="state" content="{state}">
    <meta name="city" content="{city}">
    <meta name="zip" content="78701">
    <meta name="address" content="{address}">
    <script type="application/ld+json">
        {{"@context": "https://schema.org", "@type": "Restaurant",
          "geo": {{"@type": "GeoCoordinates", "latitude": 30.27, "longitude": -97.74}}}}
    </script>
</head>
<body>
    <div class="js-favorite"><a class="ga-link" href="#" data-fid="{store_id}">Favorite</a></div>
    <div class="hide-mobile">
        <div class="day-hour-row">
            <span data-daypart="Monday">Mon</span>
            <span class="time-open">7:00</span> - <span class="time-close">22:00</span>
        </div>
    </div>
</body>
</html>"##
    )
}

/// Serve `body` at `route` on the mock server
#[allow(dead_code)]
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
