use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Единообразная обёртка успешного ответа: `{ data }`.
pub struct Envelope<T> {
    /// Разобранное тело ответа.
    pub data: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Параметры query-строки.
///
/// Порядок параметров совпадает с порядком вставки. Параметры без значения
/// (`None`) хранятся, но в query-строку не попадают.
pub struct QueryParams {
    pairs: Vec<(String, Option<String>)>,
}

impl QueryParams {
    /// Пустой набор параметров.
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет параметр со значением.
    pub fn set(self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set_opt(key, Some(value))
    }

    /// Добавляет параметр, который может отсутствовать.
    ///
    /// Повторная установка ключа заменяет значение, сохраняя исходную позицию.
    pub fn set_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        let key = key.into();
        let value = value.map(|value| value.to_string());
        match self.pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
        self
    }

    /// Параметры, которые попадут в query-строку.
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
    }

    /// `true`, если в query-строку не попадёт ни одного параметра.
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

#[derive(Debug, Clone)]
/// Ответ без разбора тела: для endpoint-ов без контракта на тело.
pub struct RawResponse {
    /// HTTP-статус (всегда 2xx).
    pub status: u16,
    /// Тело ответа как есть.
    pub body: Vec<u8>,
}

impl RawResponse {
    fn is_blank(&self) -> bool {
        self.status == StatusCode::NO_CONTENT.as_u16() || self.body.trim_ascii().is_empty()
    }

    fn decode<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Clone)]
/// HTTP-обёртка над REST API доски.
///
/// Единственная точка обращения к backend: подставляет bearer-токен из
/// хранилища сессии, собирает query-строку и приводит ответы к
/// [`Envelope`] / [`ApiError`].
pub struct HttpClient {
    base_url: String,
    client: Client,
    session: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Создаёт клиент с базовым URL сервера и хранилищем сессии.
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionStore>) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("board-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::from_reqwest)?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            session,
        })
    }

    /// Базовый URL сервера.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Хранилище сессии, из которого берётся токен.
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// GET-запрос с query-параметрами.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> ApiResult<Envelope<T>> {
        let raw = self
            .send::<()>(Method::GET, path, Some(params), None)
            .await?;
        Ok(Envelope { data: raw.decode()? })
    }

    /// POST-запрос с JSON-телом.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<Envelope<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let raw = self.send(Method::POST, path, None, Some(body)).await?;
        Ok(Envelope { data: raw.decode()? })
    }

    /// PUT-запрос с JSON-телом.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<Envelope<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let raw = self.send(Method::PUT, path, None, Some(body)).await?;
        Ok(Envelope { data: raw.decode()? })
    }

    /// DELETE-запрос.
    ///
    /// `204 No Content` и пустое тело дают `data: None` без попытки разбора.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Envelope<Option<T>>> {
        let raw = self.send::<()>(Method::DELETE, path, None, None).await?;
        if raw.is_blank() {
            return Ok(Envelope { data: None });
        }
        Ok(Envelope {
            data: Some(raw.decode()?),
        })
    }

    /// Отправляет запрос и возвращает успешный ответ без разбора тела.
    ///
    /// Статус вне 2xx превращается в [`ApiError::Http`] с best-effort телом.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&B>,
    ) -> ApiResult<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = resolve_url(&self.base_url, path, params)?;
        debug!(%method, %url, "sending request");

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        debug!(%method, status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(decode_error(status, response).await);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(RawResponse {
                status: status.as_u16(),
                body: Vec::new(),
            });
        }

        let body = response.bytes().await.map_err(ApiError::from_reqwest)?;
        Ok(RawResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

async fn decode_error(status: StatusCode, response: reqwest::Response) -> ApiError {
    let body = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|_| empty_object()),
        Err(_) => empty_object(),
    };
    ApiError::Http {
        status: status.as_u16(),
        body,
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Собирает URL запроса: `base + path` и query-строка, если она не пустая.
pub fn resolve_url(base_url: &str, path: &str, params: Option<&QueryParams>) -> ApiResult<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url =
        Url::parse(&joined).map_err(|err| ApiError::Transport(format!("invalid url {joined}: {err}")))?;

    if let Some(params) = params.filter(|params| !params.is_empty()) {
        let mut query = url.query_pairs_mut();
        for (key, value) in params.present() {
            query.append_pair(key, value);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8080";

    #[test]
    fn resolve_url_normalizes_slashes() {
        let url = resolve_url("http://localhost:8080/", "/api/posts", None).expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:8080/api/posts");
    }

    #[test]
    fn resolve_url_omits_empty_query() {
        let params = QueryParams::new().set_opt("keyword", None::<&str>);
        let url = resolve_url(BASE, "/api/posts/page", Some(&params)).expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:8080/api/posts/page");
        assert!(url.query().is_none());
    }

    #[test]
    fn query_skips_absent_values_and_keeps_order() {
        let params = QueryParams::new()
            .set_opt("keyword", None::<String>)
            .set("page", 0)
            .set("size", 10u32)
            .set_opt("sort", None::<&str>)
            .set("flag", true);
        let url = resolve_url(BASE, "/api/posts/search", Some(&params)).expect("valid url");
        assert_eq!(url.query(), Some("page=0&size=10&flag=true"));
    }

    #[test]
    fn query_replaces_repeated_key_in_place() {
        let params = QueryParams::new()
            .set("page", 1)
            .set("size", 10)
            .set("page", 2);
        let collected: Vec<_> = params.present().collect();
        assert_eq!(collected, vec![("page", "2"), ("size", "10")]);

        let params = params.set_opt("page", None::<u32>);
        let collected: Vec<_> = params.present().collect();
        assert_eq!(collected, vec![("size", "10")]);
    }

    #[test]
    fn query_values_are_form_encoded() {
        let params = QueryParams::new().set("keyword", "rust & go");
        let url = resolve_url(BASE, "/api/posts/search", Some(&params)).expect("valid url");
        assert_eq!(url.query(), Some("keyword=rust+%26+go"));
    }

    #[test]
    fn resolve_url_rejects_relative_base() {
        let err = resolve_url("", "/api/posts", None).expect_err("relative url must fail");
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn blank_raw_response_detection() {
        let no_content = RawResponse {
            status: 204,
            body: Vec::new(),
        };
        assert!(no_content.is_blank());

        let whitespace = RawResponse {
            status: 200,
            body: b"  \n".to_vec(),
        };
        assert!(whitespace.is_blank());

        let json = RawResponse {
            status: 200,
            body: br#"{"id":1}"#.to_vec(),
        };
        assert!(!json.is_blank());
    }
}
