//! Common test utilities

use portada::models::ArticleRecord;

/// Create a test record with default values
#[allow(dead_code)]
pub fn create_test_record() -> ArticleRecord {
    ArticleRecord::new(
        "https://www.diariodecuyo.com.ar/politica/laciar-inauguro-plaza-n123",
        "Diario de Cuyo",
        "Laciar inauguró la plaza renovada",
        Some("La obra demandó seis meses".to_string()),
        "La intendenta recorrió la plaza junto a vecinos del barrio.\n\nLos trabajos incluyeron alumbrado público y nuevos juegos.",
        None,
    )
    .unwrap()
}

/// Create a record with a specific URL and source
#[allow(dead_code)]
pub fn create_record_with_url(url: &str, source: &str) -> ArticleRecord {
    ArticleRecord::new(
        url,
        source,
        format!("Titulo para {url}"),
        None,
        "Cuerpo de prueba con texto suficiente para el registro.",
        None,
    )
    .unwrap()
}
