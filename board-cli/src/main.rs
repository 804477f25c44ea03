use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use board_client::screens::{self, Next, Notice, PostDetailView, PostListView};
use board_client::{
    BoardClient, CommentForm, FileSessionStore, ListQuery, LoginForm, Post, PostForm,
    RegisterForm, Route,
};
use clap::{Parser, Subcommand};

mod logging;
mod settings;

use logging::init_logging;
use settings::{Settings, resolve_server};

const MAX_PAGE_BUTTONS: usize = 20;

#[derive(Debug, Parser)]
#[command(name = "board-cli", version, about = "CLI клиент для доски объявлений")]
struct Cli {
    /// Адрес сервера (по умолчанию BOARD_API_URL).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Подробные логи запросов в stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация участника.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: String,
    },
    /// Вход.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Выход (удаляет сохранённую сессию).
    Logout,
    /// Текущий пользователь.
    Whoami,
    /// Список постов.
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Размер страницы (по умолчанию BOARD_PAGE_SIZE).
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        keyword: Option<String>,
        /// Все посты одним списком, без пагинации.
        #[arg(long, conflicts_with_all = ["page", "size", "keyword"])]
        all: bool,
    },
    /// Пост с комментариями.
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Создание поста (требует входа).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Редактирование поста (требует входа).
    ///
    /// Если `--content` не указан, используется текущее содержимое поста.
    Edit {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: Option<String>,
    },
    /// Удаление поста.
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Комментарии.
    #[command(subcommand)]
    Comment(CommentCommand),
    /// Открыть клиентский маршрут, например `/post/5` или `/?page=1`.
    Open { route: String },
}

#[derive(Debug, Subcommand)]
enum CommentCommand {
    /// Добавить комментарий к посту.
    Add {
        #[arg(long)]
        post_id: i64,
        #[arg(long)]
        content: String,
    },
    /// Удалить комментарий.
    Delete {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        post_id: i64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    init_logging(&settings.log_level, cli.verbose)?;

    let base_url = resolve_server(cli.server, &settings.api_url);
    let store = Arc::new(FileSessionStore::new(&settings.session_file));
    let client = BoardClient::new(base_url, store).context("не удалось создать HTTP-клиент")?;

    match cli.command {
        Command::Register {
            username,
            password,
            email,
        } => {
            let form = RegisterForm {
                username,
                password,
                email,
            };
            finish(screens::submit_register(&client, &form).await)
        }
        Command::Login { username, password } => {
            let form = LoginForm { username, password };
            finish(screens::submit_login(&client, &form).await)
        }
        Command::Logout => finish(screens::logout(&client)),
        Command::Whoami => {
            let session = client
                .current_session()
                .context("не удалось прочитать сессию")?;
            match session {
                Some(session) => println!(
                    "{} (id={})",
                    session.user().username,
                    session.user().id
                ),
                None => println!("anonymous"),
            }
            Ok(())
        }
        Command::List {
            page,
            size,
            keyword,
            all,
        } => {
            if all {
                return list_all(&client).await;
            }
            let query = ListQuery {
                page,
                size: size.filter(|size| *size > 0).unwrap_or(settings.page_size),
                keyword,
            };
            show_list(&client, query).await
        }
        Command::Show { id } => show_detail(&client, id).await,
        Command::Create { title, content } => {
            let form = PostForm { title, content };
            finish(screens::submit_new_post(&client, &form).await)
        }
        Command::Edit { id, title, content } => {
            // Без --content сохраняем текущее содержимое поста.
            let content = match content {
                Some(content) => content,
                None => match client.get_post(id).await {
                    Ok(post) => post.content,
                    Err(err) => return finish(screens::fail(&client, err)),
                },
            };
            let form = PostForm { title, content };
            finish(screens::submit_edit_post(&client, id, &form).await)
        }
        Command::Delete { id } => finish(screens::delete_post(&client, id).await),
        Command::Comment(CommentCommand::Add { post_id, content }) => {
            let form = CommentForm { content };
            finish(screens::submit_comment(&client, post_id, &form).await)
        }
        Command::Comment(CommentCommand::Delete { id, post_id }) => {
            finish(screens::delete_comment(&client, post_id, id).await)
        }
        Command::Open { route } => {
            let route = Route::parse(&route).ok_or_else(|| anyhow!("неизвестный маршрут: {route}"))?;
            open(&client, route).await
        }
    }
}

async fn open(client: &BoardClient, route: Route) -> Result<()> {
    match route {
        Route::Home(query) => show_list(client, query).await,
        Route::PostDetail(id) => show_detail(client, id).await,
        Route::EditPost(id) => {
            println!("Редактирование поста {id}: board-cli edit --id {id} --title ...");
            Ok(())
        }
        Route::NewPost => {
            println!("Новый пост: board-cli create --title ... --content ...");
            Ok(())
        }
        Route::Login => {
            println!("Вход: board-cli login --username ... --password ...");
            Ok(())
        }
        Route::Register => {
            println!("Регистрация: board-cli register --username ... --password ... --email ...");
            Ok(())
        }
    }
}

async fn show_list(client: &BoardClient, query: ListQuery) -> Result<()> {
    match screens::load_post_list(client, query).await {
        Ok(view) => {
            print_list(&view);
            Ok(())
        }
        Err(next) => finish(next),
    }
}

async fn list_all(client: &BoardClient) -> Result<()> {
    match client.list_posts().await {
        Ok(posts) => {
            println!("Постов: {}", posts.len());
            for post in &posts {
                print_row(post);
            }
            Ok(())
        }
        Err(err) => finish(screens::fail(client, err)),
    }
}

async fn show_detail(client: &BoardClient, id: i64) -> Result<()> {
    match screens::load_post_detail(client, id).await {
        Ok(view) => {
            print_detail(&view);
            Ok(())
        }
        Err(next) => finish(next),
    }
}

/// Печатает результат действия. Сообщение об ошибке завершает команду с
/// ненулевым кодом.
fn finish(next: Next) -> Result<()> {
    match next {
        Next::Go {
            to,
            notice: Some(Notice::LoginRequired),
        } => bail!("{} (-> {to})", Notice::LoginRequired),
        Next::Go { to, notice } => {
            if let Some(notice) = notice {
                println!("{notice}");
            }
            println!("-> {to}");
            Ok(())
        }
        Next::Stay(notice) => bail!("{notice}"),
    }
}

fn print_row(post: &Post) {
    println!(
        "- [{}] {} (автор: {}, просмотров: {})",
        post.id,
        post.title,
        post.username.as_deref().unwrap_or("-"),
        post.view_count
    );
}

fn print_list(view: &PostListView) {
    match view.query.keyword() {
        Some(keyword) => println!("Поиск: {keyword}"),
        None => println!("Список постов"),
    }
    for post in &view.rows {
        print_row(post);
    }

    let mut pages: Vec<String> = view
        .page_buttons()
        .take(MAX_PAGE_BUTTONS)
        .map(|button| {
            if button.current {
                format!("[{}]", button.label)
            } else {
                button.label
            }
        })
        .collect();
    if view.total_pages as usize > MAX_PAGE_BUTTONS {
        pages.push(format!("... {}", view.total_pages));
    }
    if !pages.is_empty() {
        println!("Страницы: {}", pages.join(" "));
    }
}

fn print_detail(view: &PostDetailView) {
    let post = &view.post;
    println!("{}", post.title);
    println!("id: {}", post.id);
    println!("автор: {}", post.username.as_deref().unwrap_or("-"));
    println!("просмотров: {}", post.view_count);
    if let Some(created_at) = post.created_at {
        println!("создан: {created_at}");
    }
    println!();
    println!("{}", post.content);
    println!();
    println!("Комментарии ({}):", view.comments.len());
    for comment in &view.comments {
        println!(
            "- [{}] {}: {}",
            comment.id,
            comment.username.as_deref().unwrap_or("-"),
            comment.content
        );
    }
    if view.is_author {
        println!();
        println!("-> {}", Route::EditPost(post.id));
    }
}
