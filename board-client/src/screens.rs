//! Поведение страниц доски: что показать и куда перейти после действия.
//!
//! Каждая функция выполняет не больше одного действия пользователя и
//! возвращает [`Next`]. Ошибки разбираются единообразно через [`reaction`]:
//! 401 (или отсутствие сессии) сбрасывает сессию и ведёт на `/login`,
//! 403 оставляет пользователя на месте с сообщением об отказе, всё остальное
//! даёт общее сообщение об ошибке.

use std::fmt;

use tracing::warn;

use crate::error::{ApiError, BoardError};
use crate::models::{Comment, CommentForm, ListQuery, LoginForm, Post, PostForm, RegisterForm};
use crate::routes::Route;
use crate::BoardClient;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Сообщение, которое страница показывает пользователю.
pub enum Notice {
    /// Регистрация прошла успешно.
    Registered,
    /// Регистрация не удалась.
    RegisterFailed,
    /// Вход выполнен.
    LoggedIn(String),
    /// Вход не удался.
    LoginFailed,
    /// Выход выполнен.
    LoggedOut,
    /// Пост создан.
    PostCreated,
    /// Пост обновлён.
    PostUpdated,
    /// Пост удалён.
    PostDeleted,
    /// Комментарий добавлен.
    CommentAdded,
    /// Комментарий удалён.
    CommentDeleted,
    /// Сессия недействительна, нужен повторный вход.
    LoginRequired,
    /// Недостаточно прав.
    PermissionDenied,
    /// Не заполнены обязательные поля (перечислены через запятую).
    Invalid(String),
    /// Любая другая ошибка.
    Failed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => f.write_str("Регистрация успешна, теперь можно войти"),
            Self::RegisterFailed => f.write_str("Регистрация не удалась"),
            Self::LoggedIn(username) => write!(f, "Вход выполнен, добро пожаловать, {username}"),
            Self::LoginFailed => f.write_str("Вход не удался"),
            Self::LoggedOut => f.write_str("Выход выполнен"),
            Self::PostCreated => f.write_str("Пост создан"),
            Self::PostUpdated => f.write_str("Пост обновлён"),
            Self::PostDeleted => f.write_str("Пост удалён"),
            Self::CommentAdded => f.write_str("Комментарий добавлен"),
            Self::CommentDeleted => f.write_str("Комментарий удалён"),
            Self::LoginRequired => f.write_str("Требуется авторизация: войдите заново"),
            Self::PermissionDenied => f.write_str("Недостаточно прав для этой операции"),
            Self::Invalid(fields) => write!(f, "Заполните обязательные поля: {fields}"),
            Self::Failed => f.write_str("Не удалось выполнить запрос, попробуйте ещё раз"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Следующий шаг страницы после действия.
pub enum Next {
    /// Перейти на маршрут, возможно с сообщением.
    Go {
        /// Куда перейти.
        to: Route,
        /// Что показать после перехода.
        notice: Option<Notice>,
    },
    /// Остаться на текущей странице и показать сообщение.
    Stay(Notice),
}

impl Next {
    fn go(to: Route, notice: Notice) -> Self {
        Self::Go {
            to,
            notice: Some(notice),
        }
    }

    /// Маршрут перехода, если он есть.
    pub fn route(&self) -> Option<&Route> {
        match self {
            Self::Go { to, .. } => Some(to),
            Self::Stay(_) => None,
        }
    }

    /// Сообщение для пользователя, если оно есть.
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Go { notice, .. } => notice.as_ref(),
            Self::Stay(notice) => Some(notice),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Реакция страницы на ошибку.
pub enum Reaction {
    /// Сессия недействительна: сбросить её и перейти на `/login`.
    RedirectToLogin,
    /// Отказ в доступе: сообщить, никуда не переходить.
    PermissionDenied,
    /// Ошибка в форме: запрос не отправлялся.
    Invalid,
    /// Любая другая ошибка.
    Failed,
}

/// Классифицирует ошибку по правилам страниц.
pub fn reaction(err: &BoardError) -> Reaction {
    match err {
        BoardError::NotLoggedIn => Reaction::RedirectToLogin,
        BoardError::Api(ApiError::Http { status: 401, .. }) => Reaction::RedirectToLogin,
        BoardError::Api(ApiError::Http { status: 403, .. }) => Reaction::PermissionDenied,
        BoardError::Validation(_) => Reaction::Invalid,
        BoardError::Api(ApiError::Http { .. } | ApiError::Transport(_) | ApiError::Decode(_))
        | BoardError::Session(_) => Reaction::Failed,
    }
}

/// Применяет [`reaction`] к ошибке и возвращает следующий шаг.
pub fn fail(client: &BoardClient, err: BoardError) -> Next {
    warn!(error = %err, "board request failed");
    match reaction(&err) {
        Reaction::RedirectToLogin => {
            if let Err(clear_err) = client.logout() {
                warn!(error = %clear_err, "failed to clear stale session");
            }
            Next::go(Route::Login, Notice::LoginRequired)
        }
        Reaction::PermissionDenied => Next::Stay(Notice::PermissionDenied),
        Reaction::Invalid => Next::Stay(Notice::Invalid(invalid_fields(&err))),
        Reaction::Failed => Next::Stay(Notice::Failed),
    }
}

/// Имена полей, не прошедших проверку; сами значения в сообщение не попадают.
fn invalid_fields(err: &BoardError) -> String {
    let BoardError::Validation(errors) = err else {
        return String::new();
    };
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    fields.join(", ")
}

/// Кнопка пагинации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageButton {
    /// Номер страницы, начиная с нуля.
    pub page: u32,
    /// Подпись (номер с единицы).
    pub label: String,
    /// Текущая страница.
    pub current: bool,
    /// Маршрут перехода на эту страницу.
    pub route: Route,
}

/// Содержимое страницы списка постов.
#[derive(Debug, Clone, PartialEq)]
pub struct PostListView {
    /// Строки списка.
    pub rows: Vec<Post>,
    /// Состояние списка, для которого загружены строки.
    pub query: ListQuery,
    /// Общее число страниц.
    pub total_pages: u32,
}

impl PostListView {
    /// По одной кнопке на каждую страницу.
    ///
    /// `totalPages` приходит от backend, поэтому кнопки создаются лениво.
    pub fn page_buttons(&self) -> impl Iterator<Item = PageButton> + '_ {
        (0..self.total_pages).map(|page| PageButton {
            page,
            label: (page + 1).to_string(),
            current: page == self.query.page,
            route: Route::Home(ListQuery {
                page,
                ..self.query.clone()
            }),
        })
    }
}

/// Содержимое страницы поста.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetailView {
    /// Пост.
    pub post: Post,
    /// Комментарии к нему.
    pub comments: Vec<Comment>,
    /// Текущий пользователь — автор поста.
    pub is_author: bool,
}

/// `/register`: отправка формы регистрации.
pub async fn submit_register(client: &BoardClient, form: &RegisterForm) -> Next {
    match client.register(form).await {
        Ok(()) => Next::go(Route::Login, Notice::Registered),
        Err(err) => {
            warn!(error = %err, "registration failed");
            Next::Stay(Notice::RegisterFailed)
        }
    }
}

/// `/login`: отправка формы входа.
///
/// Ошибка входа не трогает хранилище сессии и оставляет пользователя на
/// `/login`.
pub async fn submit_login(client: &BoardClient, form: &LoginForm) -> Next {
    match client.login(form).await {
        Ok(session) => Next::go(Route::home(), Notice::LoggedIn(session.into_user().username)),
        Err(err) => {
            warn!(error = %err, "login failed");
            Next::Stay(Notice::LoginFailed)
        }
    }
}

/// Выход: сессия удаляется, переход на `/login`.
pub fn logout(client: &BoardClient) -> Next {
    match client.logout() {
        Ok(()) => Next::go(Route::Login, Notice::LoggedOut),
        Err(err) => fail(client, err),
    }
}

/// `/`: загрузка страницы списка.
///
/// С непустой строкой поиска используется `/api/posts/search`, иначе
/// `/api/posts/page`.
pub async fn load_post_list(client: &BoardClient, query: ListQuery) -> Result<PostListView, Next> {
    let result = match query.keyword() {
        Some(keyword) => client.search_posts(keyword, query.page, query.size).await,
        None => client.posts_page(query.page, query.size).await,
    };

    match result {
        Ok(page) => Ok(PostListView {
            rows: page.content,
            total_pages: page.total_pages,
            query,
        }),
        Err(err) => Err(fail(client, err)),
    }
}

/// `/post/:postId`: пост и комментарии.
pub async fn load_post_detail(client: &BoardClient, id: i64) -> Result<PostDetailView, Next> {
    let post = client.get_post(id).await.map_err(|err| fail(client, err))?;
    let comments = client
        .list_comments(id)
        .await
        .map_err(|err| fail(client, err))?;

    let is_author = match client.current_session() {
        Ok(Some(session)) => post.member_id == Some(session.user().id),
        Ok(None) => false,
        Err(err) => {
            warn!(error = %err, "failed to read session");
            false
        }
    };

    Ok(PostDetailView {
        post,
        comments,
        is_author,
    })
}

/// `/post/new`: создание поста.
pub async fn submit_new_post(client: &BoardClient, form: &PostForm) -> Next {
    match client.create_post(form).await {
        Ok(post) => Next::go(Route::PostDetail(post.id), Notice::PostCreated),
        Err(err) => fail(client, err),
    }
}

/// `/post/edit/:postId`: сохранение изменений.
pub async fn submit_edit_post(client: &BoardClient, id: i64, form: &PostForm) -> Next {
    match client.update_post(id, form).await {
        Ok(post) => Next::go(Route::PostDetail(post.id), Notice::PostUpdated),
        Err(err) => fail(client, err),
    }
}

/// Удаление поста со страницы `/post/:postId`.
///
/// Пост убирается из списка только после ответа сервера: при ошибке
/// переход на список не происходит.
pub async fn delete_post(client: &BoardClient, id: i64) -> Next {
    match client.delete_post(id).await {
        Ok(()) => Next::go(Route::home(), Notice::PostDeleted),
        Err(err) => fail(client, err),
    }
}

/// Добавление комментария на странице поста.
pub async fn submit_comment(client: &BoardClient, post_id: i64, form: &CommentForm) -> Next {
    match client.create_comment(post_id, form).await {
        Ok(_) => Next::go(Route::PostDetail(post_id), Notice::CommentAdded),
        Err(err) => fail(client, err),
    }
}

/// Удаление комментария на странице поста.
pub async fn delete_comment(client: &BoardClient, post_id: i64, comment_id: i64) -> Next {
    match client.delete_comment(comment_id).await {
        Ok(()) => Next::go(Route::PostDetail(post_id), Notice::CommentDeleted),
        Err(err) => fail(client, err),
    }
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;

    fn http_error(status: u16) -> BoardError {
        BoardError::Api(ApiError::Http {
            status,
            body: serde_json::json!({}),
        })
    }

    #[test]
    fn reaction_follows_status() {
        assert_eq!(reaction(&http_error(401)), Reaction::RedirectToLogin);
        assert_eq!(reaction(&http_error(403)), Reaction::PermissionDenied);
        assert_eq!(reaction(&http_error(404)), Reaction::Failed);
        assert_eq!(reaction(&http_error(500)), Reaction::Failed);
        assert_eq!(reaction(&BoardError::NotLoggedIn), Reaction::RedirectToLogin);
        assert_eq!(
            reaction(&BoardError::Api(ApiError::Transport("offline".to_string()))),
            Reaction::Failed
        );
    }

    #[test]
    fn page_buttons_cover_all_pages() {
        let view = PostListView {
            rows: Vec::new(),
            query: ListQuery {
                page: 1,
                keyword: Some("rust".to_string()),
                ..ListQuery::default()
            },
            total_pages: 3,
        };

        let buttons: Vec<PageButton> = view.page_buttons().collect();
        assert_eq!(buttons.len(), 3);
        assert_eq!(
            buttons.iter().map(|b| b.label.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );
        assert!(buttons[1].current);
        assert!(!buttons[0].current);
        assert_eq!(buttons[2].route.to_string(), "/?page=2&keyword=rust");
    }

    #[test]
    fn page_buttons_are_lazy_for_huge_page_counts() {
        let view = PostListView {
            rows: Vec::new(),
            query: ListQuery::default(),
            total_pages: u32::MAX,
        };

        let first: Vec<PageButton> = view.page_buttons().take(2).collect();
        assert_eq!(first.len(), 2);
        assert!(first[0].current);
        assert_eq!(first[1].route.to_string(), "/?page=1");
    }

    #[test]
    fn invalid_notice_lists_field_names_only() {
        let form = PostForm {
            title: String::new(),
            content: String::new(),
        };
        let err = BoardError::from(form.validate().expect_err("empty form is invalid"));

        let client = BoardClient::new(
            "http://127.0.0.1:9",
            std::sync::Arc::new(crate::MemorySessionStore::new()),
        )
        .expect("client builds");
        assert_eq!(
            fail(&client, err),
            Next::Stay(Notice::Invalid("content, title".to_string()))
        );
    }

    #[test]
    fn next_accessors() {
        let next = Next::go(Route::Login, Notice::LoginRequired);
        assert_eq!(next.route(), Some(&Route::Login));
        assert_eq!(next.notice(), Some(&Notice::LoginRequired));

        let stay = Next::Stay(Notice::PermissionDenied);
        assert!(stay.route().is_none());
    }
}
