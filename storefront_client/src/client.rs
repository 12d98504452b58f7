use crate::error::ClientError;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;

/// Base URL plus optional bearer token, shared by all resource services.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:5000`; the `/api` prefix is added per call.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::BaseUrl(base_url));
        }
        let base = Url::parse(&base_url).map_err(|_| ClientError::BaseUrl(base_url.clone()))?;
        Ok(ApiClient {
            http: Client::new(),
            base_url,
            base,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/api` followed by `segments`, each percent-encoded, so ids and codes never change the route.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::BaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "api request");
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(builder: RequestBuilder) -> Result<Value, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn get(&self, path: &[&str], query: &[(&str, &str)]) -> Result<Value, ClientError> {
        Self::send(self.request(Method::GET, path)?.query(query)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &[&str], body: &B) -> Result<Value, ClientError> {
        Self::send(self.request(Method::POST, path)?.json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &[&str], body: &B) -> Result<Value, ClientError> {
        Self::send(self.request(Method::PUT, path)?.json(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &[&str], body: &B) -> Result<Value, ClientError> {
        Self::send(self.request(Method::PATCH, path)?.json(body)).await
    }

    pub async fn delete(&self, path: &[&str]) -> Result<Value, ClientError> {
        Self::send(self.request(Method::DELETE, path)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert!(client.token().is_none());
        assert_eq!(client.with_token("t").token(), Some("t"));
    }

    #[test]
    fn segments_are_percent_encoded() {
        let client = ApiClient::new("http://localhost:5000").unwrap();
        let url = client.url(&["shipments", "track", "A/B?c#d"]).unwrap();
        assert_eq!(url.path(), "/api/shipments/track/A%2FB%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let client = ApiClient::new("https://shop.example/store/").unwrap();
        assert_eq!(
            client.url(&["products", "featured"]).unwrap().as_str(),
            "https://shop.example/store/api/products/featured"
        );
    }

    #[test]
    fn base_url_needs_a_scheme() {
        assert!(matches!(ApiClient::new("localhost:5000"), Err(ClientError::BaseUrl(_))));
    }
}
