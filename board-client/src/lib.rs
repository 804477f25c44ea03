//! Клиентская библиотека для REST API доски объявлений (board).
//!
//! Все обращения к backend идут через [`HttpClient`]: он подставляет
//! bearer-токен из [`SessionStore`], собирает query-строку и приводит ответы
//! к [`Envelope`] или [`ApiError`]. Поверх него [`BoardClient`] даёт по
//! одному типизированному методу на endpoint, а [`screens`] описывает, что
//! делает каждая страница после действия пользователя.
#![warn(missing_docs)]

mod error;
mod http_client;
mod models;
pub mod routes;
pub mod screens;
pub mod session;

pub use error::{ApiError, ApiResult, BoardError, BoardResult, SessionError};
pub use http_client::{Envelope, HttpClient, QueryParams, RawResponse, resolve_url};
pub use models::{
    Comment, CommentForm, DEFAULT_PAGE_SIZE, ListQuery, LoginForm, LoginResponse, Member, Page,
    Post, PostForm, RegisterForm,
};
pub use routes::Route;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};

use std::sync::Arc;

use reqwest::Method;
use serde::de::Error as _;
use tracing::{debug, info};
use validator::Validate;

use models::{CommentPayload, PostPayload};

#[derive(Debug, Clone)]
/// Типизированный клиент доски поверх [`HttpClient`].
pub struct BoardClient {
    http: HttpClient,
}

impl BoardClient {
    /// Создаёт клиент с базовым URL сервера и хранилищем сессии.
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionStore>) -> BoardResult<Self> {
        Ok(Self {
            http: HttpClient::new(base_url, session)?,
        })
    }

    /// Низкоуровневая HTTP-обёртка.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Текущая сессия, если пользователь вошёл.
    pub fn current_session(&self) -> BoardResult<Option<Session>> {
        Ok(self.http.session().load()?)
    }

    /// Регистрирует участника. Тело успешного ответа не используется.
    pub async fn register(&self, form: &RegisterForm) -> BoardResult<()> {
        self.http
            .send(Method::POST, "/api/members/register", None, Some(form))
            .await?;
        info!(username = %form.username, "member registered");
        Ok(())
    }

    /// Выполняет вход и сохраняет сессию.
    ///
    /// При любой ошибке хранилище сессии не изменяется.
    pub async fn login(&self, form: &LoginForm) -> BoardResult<Session> {
        let response = self
            .http
            .post::<LoginResponse, _>("/api/members/login", form)
            .await?
            .data;

        let session = Session::new(response.token, response.member).ok_or_else(|| {
            ApiError::Decode(serde_json::Error::custom("login response carries an empty token"))
        })?;
        self.http.session().save(&session)?;
        info!(member_id = session.user().id, "logged in");
        Ok(session)
    }

    /// Завершает сессию: токен и пользователь удаляются вместе.
    pub fn logout(&self) -> BoardResult<()> {
        self.http.session().clear()?;
        debug!("session cleared");
        Ok(())
    }

    /// Все посты без пагинации.
    pub async fn list_posts(&self) -> BoardResult<Vec<Post>> {
        Ok(self.http.get("/api/posts", &QueryParams::new()).await?.data)
    }

    /// Страница постов.
    pub async fn posts_page(&self, page: u32, size: u32) -> BoardResult<Page<Post>> {
        let params = QueryParams::new().set("page", page).set("size", size);
        Ok(self.http.get("/api/posts/page", &params).await?.data)
    }

    /// Страница постов, отфильтрованных по строке поиска.
    pub async fn search_posts(&self, keyword: &str, page: u32, size: u32) -> BoardResult<Page<Post>> {
        let params = QueryParams::new()
            .set("keyword", keyword)
            .set("page", page)
            .set("size", size);
        Ok(self.http.get("/api/posts/search", &params).await?.data)
    }

    /// Пост по идентификатору.
    pub async fn get_post(&self, id: i64) -> BoardResult<Post> {
        Ok(self
            .http
            .get(&format!("/api/posts/{id}"), &QueryParams::new())
            .await?
            .data)
    }

    /// Создаёт пост от имени текущего пользователя.
    pub async fn create_post(&self, form: &PostForm) -> BoardResult<Post> {
        form.validate()?;
        let member = self.require_member()?;
        let payload = PostPayload {
            title: &form.title,
            content: &form.content,
            member_id: member.id,
        };
        Ok(self.http.post("/api/posts", &payload).await?.data)
    }

    /// Обновляет пост от имени текущего пользователя.
    pub async fn update_post(&self, id: i64, form: &PostForm) -> BoardResult<Post> {
        form.validate()?;
        let member = self.require_member()?;
        let payload = PostPayload {
            title: &form.title,
            content: &form.content,
            member_id: member.id,
        };
        Ok(self
            .http
            .put(&format!("/api/posts/{id}"), &payload)
            .await?
            .data)
    }

    /// Удаляет пост. Права проверяет backend.
    pub async fn delete_post(&self, id: i64) -> BoardResult<()> {
        self.http
            .delete::<serde_json::Value>(&format!("/api/posts/{id}"))
            .await?;
        Ok(())
    }

    /// Комментарии к посту.
    pub async fn list_comments(&self, post_id: i64) -> BoardResult<Vec<Comment>> {
        Ok(self
            .http
            .get(&format!("/api/comments/post/{post_id}"), &QueryParams::new())
            .await?
            .data)
    }

    /// Добавляет комментарий от имени текущего пользователя.
    pub async fn create_comment(&self, post_id: i64, form: &CommentForm) -> BoardResult<Comment> {
        let member = self.require_member()?;
        let payload = CommentPayload {
            content: &form.content,
            post_id,
            member_id: member.id,
        };
        Ok(self.http.post("/api/comments", &payload).await?.data)
    }

    /// Удаляет комментарий. Права проверяет backend.
    pub async fn delete_comment(&self, id: i64) -> BoardResult<()> {
        self.http
            .delete::<serde_json::Value>(&format!("/api/comments/{id}"))
            .await?;
        Ok(())
    }

    fn require_member(&self) -> BoardResult<Member> {
        self.current_session()?
            .map(Session::into_user)
            .ok_or(BoardError::NotLoggedIn)
    }
}
