//! Клиентские маршруты и состояние списка в query-строке.

use std::fmt;

use reqwest::Url;

use crate::models::{DEFAULT_PAGE_SIZE, ListQuery};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Клиентские маршруты приложения.
pub enum Route {
    /// `/register`
    Register,
    /// `/login`
    Login,
    /// `/` со страницей и строкой поиска в query.
    Home(ListQuery),
    /// `/post/new`
    NewPost,
    /// `/post/:postId`
    PostDetail(i64),
    /// `/post/edit/:postId`
    EditPost(i64),
}

impl Route {
    /// Главная страница без параметров.
    pub fn home() -> Self {
        Self::Home(ListQuery::default())
    }

    /// Разбирает путь вида `/post/5` или `/?page=2&keyword=rust`.
    ///
    /// Неизвестный путь даёт `None`. Некорректные `page`/`size` в query
    /// заменяются значениями по умолчанию.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse("http://board.local").ok()?.join(raw.trim()).ok()?;
        let segments: Vec<&str> = url
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Some(Self::Home(parse_list_query(&url))),
            ["register"] => Some(Self::Register),
            ["login"] => Some(Self::Login),
            ["post", "new"] => Some(Self::NewPost),
            ["post", "edit", id] => id.parse().ok().map(Self::EditPost),
            ["post", id] => id.parse().ok().map(Self::PostDetail),
            _ => None,
        }
    }
}

fn parse_list_query(url: &Url) -> ListQuery {
    let mut query = ListQuery::default();
    for (key, value) in url.query_pairs() {
        match &*key {
            "page" => query.page = value.parse::<u32>().unwrap_or(0),
            "size" => {
                query.size = value
                    .parse::<u32>()
                    .ok()
                    .filter(|size| *size > 0)
                    .unwrap_or(DEFAULT_PAGE_SIZE)
            }
            "keyword" if !value.trim().is_empty() => query.keyword = Some(value.into_owned()),
            _ => {}
        }
    }
    query
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => f.write_str("/register"),
            Self::Login => f.write_str("/login"),
            Self::NewPost => f.write_str("/post/new"),
            Self::PostDetail(id) => write!(f, "/post/{id}"),
            Self::EditPost(id) => write!(f, "/post/edit/{id}"),
            Self::Home(query) => {
                let mut pairs = Vec::new();
                if query.page != 0 {
                    pairs.push(("page", query.page.to_string()));
                }
                if query.size != DEFAULT_PAGE_SIZE {
                    pairs.push(("size", query.size.to_string()));
                }
                if let Some(keyword) = query.keyword() {
                    pairs.push(("keyword", keyword.to_string()));
                }
                if pairs.is_empty() {
                    return f.write_str("/");
                }
                let mut url = Url::parse("http://board.local/").map_err(|_| fmt::Error)?;
                url.query_pairs_mut()
                    .extend_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str())));
                write!(f, "/?{}", url.query().unwrap_or_default())
            }
        }
    }
}
