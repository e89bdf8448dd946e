//! URL construction for the API resources the crawler touches.

use camara_model::QueryParams;
use reqwest::Url;

use super::client::FetchError;

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: base_url.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        Ok(Self { base })
    }

    /// `GET /partidos`
    #[must_use]
    pub fn organizations(&self, params: &QueryParams) -> String {
        self.build("partidos", params)
    }

    /// `GET /partidos/{id}/membros`
    #[must_use]
    pub fn organization_members(&self, organization_id: i64, params: &QueryParams) -> String {
        self.build(&format!("partidos/{organization_id}/membros"), params)
    }

    /// `GET /deputados/{id}/discursos`
    #[must_use]
    pub fn member_records(&self, member_id: i64, params: &QueryParams) -> String {
        self.build(&format!("deputados/{member_id}/discursos"), params)
    }

    /// `GET /partidos/{id}`
    #[must_use]
    pub fn organization(&self, organization_id: i64) -> String {
        self.build(&format!("partidos/{organization_id}"), &QueryParams::new())
    }

    /// `GET /deputados/{id}`
    #[must_use]
    pub fn member(&self, member_id: i64) -> String {
        self.build(&format!("deputados/{member_id}"), &QueryParams::new())
    }

    fn build(&self, path: &str, params: &QueryParams) -> String {
        let mut url = self.base.clone();
        let full_path = format!("{}/{path}", self.base.path().trim_end_matches('/'));
        url.set_path(&full_path);
        url.set_query(None);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.pairs());
        }
        url.into()
    }
}
