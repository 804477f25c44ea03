use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки HTTP-обёртки.
///
/// Три варианта взаимоисключающие: транспортная ошибка не несёт статуса,
/// HTTP-ошибка всегда несёт статус и тело, ошибка декодирования возникает
/// только на успешном ответе.
pub enum ApiError {
    /// Запрос не удалось выполнить (соединение, DNS, построение запроса).
    #[error("transport error: {0}")]
    Transport(String),

    /// Сервер ответил статусом вне диапазона 2xx.
    ///
    /// `body` содержит разобранное JSON-тело ошибки или `{}`, если тело
    /// пустое или не является JSON.
    #[error("http error {status}")]
    Http {
        /// HTTP-статус ответа.
        status: u16,
        /// Тело ответа (best-effort).
        body: serde_json::Value,
    },

    /// Успешный ответ с телом, которое не удалось разобрать как JSON.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Результат операций HTTP-обёртки.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }

    /// Возвращает HTTP-статус, если ошибка пришла от сервера.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

#[derive(Debug, Error)]
/// Ошибки хранилища сессии.
pub enum SessionError {
    /// Ошибка чтения/записи файла сессии.
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),

    /// Сессию не удалось сериализовать.
    #[error("session encode error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `board-client`.
pub enum BoardError {
    /// Ошибка обращения к backend.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Ошибка хранилища сессии.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Форма заполнена некорректно, запрос не отправлялся.
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Операция требует вошедшего пользователя.
    #[error("not logged in")]
    NotLoggedIn,
}

/// Результат операций `board-client`.
pub type BoardResult<T> = Result<T, BoardError>;

impl BoardError {
    /// HTTP-статус, если ошибка пришла от сервера.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status(),
            _ => None,
        }
    }
}
