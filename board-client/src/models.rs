use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use validator::Validate;

/// Размер страницы списка постов по умолчанию.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Публичная модель участника (пользователя).
pub struct Member {
    /// Идентификатор участника.
    pub id: i64,
    /// Логин.
    pub username: String,
    /// Email, если backend его вернул.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель поста.
///
/// В списках backend может отдавать усечённый пост, поэтому всё, кроме
/// `id` и `title`, имеет значение по умолчанию.
pub struct Post {
    /// Идентификатор поста.
    pub id: i64,
    /// Заголовок.
    pub title: String,
    /// Содержимое.
    #[serde(default)]
    pub content: String,
    /// Логин автора.
    #[serde(default)]
    pub username: Option<String>,
    /// Количество просмотров.
    #[serde(default)]
    pub view_count: u64,
    /// Дата создания.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<NaiveDateTime>,
    /// Идентификатор автора.
    #[serde(default)]
    pub member_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель комментария.
pub struct Comment {
    /// Идентификатор комментария.
    pub id: i64,
    /// Текст комментария.
    pub content: String,
    /// Логин автора.
    #[serde(default)]
    pub username: Option<String>,
    /// Дата создания.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<NaiveDateTime>,
    /// Пост, к которому относится комментарий.
    #[serde(default)]
    pub post_id: Option<i64>,
    /// Идентификатор автора.
    #[serde(default)]
    pub member_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Страница выборки: `{content, totalPages}`.
pub struct Page<T> {
    /// Элементы текущей страницы.
    pub content: Vec<T>,
    /// Общее число страниц.
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
/// Ответ на успешный вход.
pub struct LoginResponse {
    /// Bearer-токен.
    pub token: String,
    /// Вошедший участник.
    pub member: Member,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Состояние списка постов, отражаемое в query-строке маршрута `/`.
pub struct ListQuery {
    /// Номер страницы, начиная с нуля.
    pub page: u32,
    /// Размер страницы.
    pub size: u32,
    /// Строка поиска.
    pub keyword: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            keyword: None,
        }
    }
}

impl ListQuery {
    /// Пустая или состоящая из пробелов строка поиска считается отсутствующей.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
/// Форма регистрации. Проверяет её backend.
pub struct RegisterForm {
    /// Логин.
    pub username: String,
    /// Пароль.
    pub password: String,
    /// Email.
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
/// Форма входа.
pub struct LoginForm {
    /// Логин.
    pub username: String,
    /// Пароль.
    pub password: String,
}

#[derive(Debug, Clone, Validate)]
/// Форма создания/редактирования поста. Оба поля обязательны.
pub struct PostForm {
    /// Заголовок.
    #[validate(length(min = 1))]
    pub title: String,
    /// Содержимое.
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Clone)]
/// Форма комментария.
pub struct CommentForm {
    /// Текст комментария.
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostPayload<'a> {
    pub(crate) title: &'a str,
    pub(crate) content: &'a str,
    pub(crate) member_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentPayload<'a> {
    pub(crate) content: &'a str,
    pub(crate) post_id: i64,
    pub(crate) member_id: i64,
}

/// `createdAt` только показывается, поэтому нераспознанный формат даёт
/// `None`, а не ошибку разбора всего поста.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = raw.as_str().and_then(parse_datetime);
    if parsed.is_none() {
        debug!(value = %raw, "unrecognized createdAt format");
    }
    Ok(parsed)
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    raw.parse::<NaiveDateTime>().ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|with_offset| with_offset.naive_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_from_list_payload_fills_defaults() {
        let post: Post =
            serde_json::from_str(r#"{"id":1,"title":"t"}"#).expect("summary must parse");
        assert_eq!(post.id, 1);
        assert_eq!(post.title, "t");
        assert_eq!(post.content, "");
        assert_eq!(post.view_count, 0);
        assert!(post.created_at.is_none());
    }

    #[test]
    fn post_reads_camel_case_fields() {
        let raw = r#"{
            "id": 7,
            "title": "hello",
            "content": "body",
            "username": "alice",
            "viewCount": 12,
            "createdAt": "2024-03-01T10:15:30.123",
            "memberId": 3
        }"#;
        let post: Post = serde_json::from_str(raw).expect("post must parse");
        assert_eq!(post.view_count, 12);
        assert_eq!(post.member_id, Some(3));
        assert_eq!(post.username.as_deref(), Some("alice"));
        assert!(post.created_at.is_some());
    }

    #[test]
    fn member_without_email_serializes_compactly() {
        let member = Member {
            id: 1,
            username: "alice".to_string(),
            email: None,
        };
        let raw = serde_json::to_string(&member).expect("member must serialize");
        assert_eq!(raw, r#"{"id":1,"username":"alice"}"#);
    }

    #[test]
    fn payloads_use_backend_field_names() {
        let raw = serde_json::to_value(CommentPayload {
            content: "c",
            post_id: 5,
            member_id: 9,
        })
        .expect("payload must serialize");
        assert_eq!(raw, serde_json::json!({"content": "c", "postId": 5, "memberId": 9}));
    }

    #[test]
    fn list_query_ignores_blank_keyword() {
        let query = ListQuery {
            keyword: Some("   ".to_string()),
            ..ListQuery::default()
        };
        assert!(query.keyword().is_none());
    }

    #[test]
    fn created_at_accepts_offset_timestamps() {
        let post: Post =
            serde_json::from_str(r#"{"id":1,"title":"t","createdAt":"2024-03-01T10:15:30Z"}"#)
                .expect("utc timestamp must parse");
        assert_eq!(
            post.created_at.map(|at| at.to_string()).as_deref(),
            Some("2024-03-01 10:15:30")
        );

        let post: Post = serde_json::from_str(
            r#"{"id":1,"title":"t","createdAt":"2024-03-01T12:15:30+02:00"}"#,
        )
        .expect("offset timestamp must parse");
        assert_eq!(
            post.created_at.map(|at| at.to_string()).as_deref(),
            Some("2024-03-01 10:15:30")
        );
    }

    #[test]
    fn unknown_created_at_does_not_break_post() {
        let comment: Comment = serde_json::from_str(
            r#"{"id":2,"content":"c","createdAt":[2024,3,1,10,15,30]}"#,
        )
        .expect("comment must parse");
        assert!(comment.created_at.is_none());

        let post: Post = serde_json::from_str(r#"{"id":1,"title":"t","createdAt":null}"#)
            .expect("null createdAt must parse");
        assert!(post.created_at.is_none());
    }

    #[test]
    fn post_form_requires_title_and_content() {
        let form = PostForm {
            title: String::new(),
            content: "x".to_string(),
        };
        let errors = form.validate().expect_err("empty title must be rejected");
        assert!(errors.field_errors().contains_key("title"));

        let form = PostForm {
            title: "t".repeat(300),
            content: "x".to_string(),
        };
        assert!(form.validate().is_ok());
    }
}
