//! Example consumer: a small blog on top of wheels.
//!
//! Copy `.env.example` to `.env` in this directory, then run from the repo root:
//! `cargo run -p example-consumer`

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde_json::{json, Value};
use std::path::Path as FsPath;
use wheels::{
    load_env, AppConfig, AppError, AppState, Application, Database, DbConfig, Entity, ErrorKind,
    Model, PgDatabase, Reply, Schema, ViewConfig, WebController,
};

struct PostRecord;

impl Entity for PostRecord {
    const SCHEMA: Schema = Schema::new("posts", &["id", "title", "body", "published_at"]);
}

type Post = Model<PostRecord>;

const CREATE_POSTS: &str = r#"CREATE TABLE IF NOT EXISTS "posts" (
    "id" BIGSERIAL PRIMARY KEY,
    "title" TEXT NOT NULL,
    "body" TEXT,
    "published_at" TIMESTAMP
)"#;

async fn index(db: PgDatabase, c: WebController) -> Reply {
    let rows = db
        .query(
            r#"SELECT "id", "title" FROM "posts" ORDER BY "id" DESC LIMIT $1"#,
            &[json!(20)],
        )
        .await?;
    if c.request_is_json() {
        return Ok(c.json(&rows, StatusCode::OK));
    }
    let rows = c.safe(&rows)?;
    let items: String = rows
        .as_array()
        .into_iter()
        .flatten()
        .map(|r| {
            format!(
                r#"<li><a href="/posts/{}">{}</a></li>"#,
                r["id"],
                r["title"].as_str().unwrap_or_default()
            )
        })
        .collect();
    Ok(c
        .view("index", &json!({}), &json!({"page_title": "Posts", "posts": items}))
        .await?)
}

async fn find(db: &PgDatabase, c: &WebController, id: String) -> Result<Post, wheels::Halt> {
    let mut post = Post::new();
    match post.load(db, id).await {
        Ok(()) => Ok(post),
        Err(e) if e.kind() == ErrorKind::InvalidArgument => {
            Err(c.abort(StatusCode::NOT_FOUND, Some("<h1>No such post</h1>")))
        }
        Err(e) => Err(e.into()),
    }
}

async fn show(Path(id): Path<String>, db: PgDatabase, c: WebController) -> Reply {
    let post = find(&db, &c, id).await?;
    if c.request_is_json() {
        return Ok(c.json(&post, StatusCode::OK));
    }
    let title = c.safe(&post.get("title"))?;
    Ok(c.view("post", &post, &json!({"page_title": title})).await?)
}

async fn create(db: PgDatabase, c: WebController) -> Reply {
    let title = c
        .input("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let Some(title) = title else {
        return Err(c.abort(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("<p>A post needs a title.</p>"),
        ));
    };

    let mut post = Post::with([
        ("title", json!(title)),
        ("body", c.input("body").cloned().unwrap_or(Value::Null)),
        ("published_at", json!(db.now())),
    ]);
    post.save(&db).await?;
    tracing::info!(id = ?post.id(), "post published");

    if c.request_is_json() {
        return Ok(c.json(&post, StatusCode::CREATED));
    }
    let id = post.id().cloned().unwrap_or(Value::Null);
    Err(c.redirect(&format!("/posts/{}", id)))
}

async fn destroy(Path(id): Path<String>, db: PgDatabase, c: WebController) -> Reply {
    let mut post = find(&db, &c, id).await?;
    post.delete(&db).await?;
    Err(c.redirect("/"))
}

async fn ensure_schema(config: &DbConfig) -> Result<(), AppError> {
    let db = PgDatabase::new(config);
    db.execute(CREATE_POSTS, &[]).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    wheels::init_tracing();

    let root = FsPath::new(env!("CARGO_MANIFEST_DIR"));
    // `.env` is looked up one level above the directory passed in.
    load_env(root.join("src"))?;

    let mut views = ViewConfig::from_env();
    if std::env::var_os("VIEW_PATH").is_none() {
        views.view_path = root.join("views");
    }
    let db = DbConfig::from_env()?;
    ensure_schema(&db).await?;

    let addr = AppConfig::from_env()?.addr;
    Application::with_state(AppState::new(views).with_db(db))
        .route("/", get(index))
        .route("/posts", post(create))
        .route("/posts/:id", get(show))
        .route("/posts/:id/delete", post(destroy))
        .listen(addr)
        .await?;
    Ok(())
}
