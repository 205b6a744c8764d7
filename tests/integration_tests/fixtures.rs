//! Test fixtures for integration tests
//!
//! Provides sample HTML data and helper functions for testing

use portada::config::Config;
use portada::models::Source;

/// Front page with one `<article>` teaser per link
pub fn front_page_html(hrefs: &[&str]) -> String {
    let teasers: String = hrefs
        .iter()
        .enumerate()
        .map(|(i, href)| {
            format!(
                r#"<article class="teaser"><h2><a href="{href}">Titular {n}</a></h2><p>Resumen</p></article>"#,
                n = i + 1
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head><meta charset="utf-8"><title>Portada</title></head>
<body>
  <nav><a href="/categoria/politica">Politica</a></nav>
  <main>{teasers}</main>
</body>
</html>"#
    )
}

/// Article page with a title, a lead, two body paragraphs and a date
pub fn article_html(title: &str, published: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="utf-8">
  <meta property="article:published_time" content="{published}">
</head>
<body>
  <h1>{title}</h1>
  <p class="lead">Bajada de la nota</p>
  <div class="entry-content">
    <p>La Municipalidad de la Ciudad de San Juan informó los detalles del anuncio realizado esta mañana.</p>
    <p>Los trabajos se extenderán durante las próximas semanas en distintos barrios de la capital.</p>
  </div>
</body>
</html>"#
    )
}

/// Page that is fetched fine but holds no article body
pub const GALLERY_HTML: &str = r#"<!DOCTYPE html>
<html><body><h1>Galeria</h1><div class="entry-content"><p>Fotos</p></div></body></html>"#;

/// Page that is not a front page
pub const MAINTENANCE_HTML: &str =
    r#"<!DOCTYPE html><html><body><p>Sitio en mantenimiento</p></body></html>"#;

/// Config tuned for tests: short timeouts, no retries, no classifier
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.request_timeout_secs = 2;
    config.crawler.max_retries = 0;
    config
}

/// Source pointing at a path of a mock server
pub fn mock_source(name: &str, server_uri: &str, path: &str) -> Source {
    Source::new(name, format!("{server_uri}{path}"))
}
