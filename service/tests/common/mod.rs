//! Common test utilities for integration tests.
//!
//! This module provides:
//!
//! - [`http_mock::MockHttpServer`] - wiremock stubs for the open-data API
//! - [`fixtures`] - JSON documents shaped like the API's listings
//! - [`fetcher`] - an `HttpPageFetcher` with test-sized timeouts and backoff

#![allow(dead_code)]

pub mod http_mock;

pub mod fixtures {
    use serde_json::{json, Value};

    pub fn listing(records: Vec<Value>) -> Value {
        json!({ "dados": records, "links": [] })
    }

    pub fn organization(id: i64, code: &str) -> Value {
        json!({
            "id": id,
            "sigla": code,
            "nome": format!("Partido {code}"),
            "uri": format!("https://dadosabertos.camara.leg.br/api/v2/partidos/{id}")
        })
    }

    pub fn member(id: i64, name: &str, code: &str) -> Value {
        json!({
            "id": id,
            "uri": format!("https://dadosabertos.camara.leg.br/api/v2/deputados/{id}"),
            "nome": name,
            "siglaPartido": code,
            "uriPartido": "https://dadosabertos.camara.leg.br/api/v2/partidos/37901",
            "siglaUf": "SP",
            "idLegislatura": 56,
            "urlFoto": format!("https://www.camara.leg.br/internet/deputado/bandep/{id}.jpg"),
            "email": null
        })
    }

    pub fn record(start: &str, transcript: &str) -> Value {
        json!({
            "dataHoraInicio": start,
            "dataHoraFim": null,
            "faseEvento": {
                "dataHoraInicio": start,
                "dataHoraFim": null,
                "titulo": "Pequeno Expediente"
            },
            "sumario": null,
            "transcricao": transcript,
            "keywords": "REFORMA TRIBUTÁRIA, ECONOMIA",
            "tipoDiscurso": "BREVES COMUNICAÇÕES",
            "uriEvento": "https://dadosabertos.camara.leg.br/api/v2/eventos/65000",
            "urlAudio": null,
            "urlTexto": null,
            "urlVideo": null
        })
    }
}

pub mod fetcher {
    use camara_crawler::camara::{HttpPageFetcher, RequestGate};
    use camara_crawler::config::RetryConfig;
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
    use std::sync::Arc;
    use std::time::Duration;

    pub fn retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 20,
            max_backoff_ms: 100,
        }
    }

    /// Fetcher with a short request timeout and fast backoff. Sends the
    /// same default headers as `HttpPageFetcher::new`.
    pub fn fast(max_retries: u32) -> HttpPageFetcher {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(300))
            .build()
            .expect("client build");

        HttpPageFetcher::with_client(
            client,
            Arc::new(RequestGate::unlimited()),
            retry(max_retries),
            Duration::from_secs(1),
        )
    }
}
