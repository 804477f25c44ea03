//! Хранилище сессии (токен + пользователь).
//!
//! Токен и пользователь читаются и пишутся только вместе, одним значением
//! [`Session`]. Запись, в которой не хватает одного из полей, считается
//! отсутствующей сессией.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::SessionError;
use crate::models::Member;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Активная сессия пользователя.
///
/// Собрать её можно только через [`Session::new`], поэтому токен в ней
/// всегда непустой и всегда идёт вместе с пользователем.
pub struct Session {
    token: String,
    user: Member,
}

impl Session {
    /// Создаёт сессию; пустой токен сессией не считается.
    pub fn new(token: impl Into<String>, user: Member) -> Option<Self> {
        let token = parse_token(&token.into())?;
        Some(Self { token, user })
    }

    /// Bearer-токен.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Вошедший участник.
    pub fn user(&self) -> &Member {
        &self.user
    }

    /// Забирает участника, отбрасывая токен.
    pub fn into_user(self) -> Member {
        self.user
    }
}

/// Единая точка чтения/записи сессии.
///
/// Реализации обязаны быть потокобезопасными: один экземпляр разделяется
/// между всеми клонами клиента.
pub trait SessionStore: Send + Sync {
    /// Читает текущую сессию.
    fn load(&self) -> Result<Option<Session>, SessionError>;

    /// Сохраняет сессию, заменяя предыдущую.
    fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// Удаляет сессию. Удаление отсутствующей сессии не ошибка.
    fn clear(&self) -> Result<(), SessionError>;

    /// Текущий токен. Ошибка чтения логируется и трактуется как «нет токена».
    fn token(&self) -> Option<String> {
        match self.load() {
            Ok(session) => session.map(|session| session.token),
            Err(err) => {
                warn!(error = %err, "failed to read session, sending request without token");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Сессия в памяти процесса.
pub struct MemorySessionStore {
    inner: Arc<Mutex<Option<Session>>>,
}

impl MemorySessionStore {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }

    /// Хранилище с уже активной сессией.
    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.lock().clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.lock() = None;
        Ok(())
    }
}

impl MemorySessionStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone)]
/// Сессия в JSON-файле `{"token": ..., "user": {...}}`.
///
/// Запись идёт в уникальный временный файл рядом с целевым, который затем
/// атомарно переименовывается, поэтому читатель видит либо старую, либо
/// новую пару целиком, даже если пишут несколько процессов сразу.
pub struct FileSessionStore {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SessionRecord {
    token: Option<String>,
    user: Option<Member>,
}

impl FileSessionStore {
    /// Хранилище по указанному пути. Файл создаётся при первом `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу сессии.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let session = parse_record(&raw);
        if session.is_none() && !raw.trim().is_empty() {
            warn!(path = %self.path.display(), "ignoring incomplete session file");
        }
        Ok(session)
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let raw = serde_json::to_vec_pretty(session)?;
        let mut temp = NamedTempFile::new_in(self.dir())?;
        temp.write_all(&raw)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn parse_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn parse_record(raw: &str) -> Option<Session> {
    let record = serde_json::from_str::<SessionRecord>(raw).ok()?;
    let token = parse_token(&record.token?)?;
    Some(Session {
        token,
        user: record.user?,
    })
}
