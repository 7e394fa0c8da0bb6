use nex::prelude::*;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    id: i64,
    title: String,
}

type Notes = Arc<RwLock<HashMap<i64, Note>>>;

async fn hello(ctx: &mut Context) -> Result<()> {
    let name = ctx.str_query_or("name", "world");
    ctx.text(200, format!("Hello, {}!", name))
}

fn list_notes(notes: Notes) -> impl Handler {
    handler_fn(move |ctx: &mut Context| {
        let notes = notes.clone();
        Box::pin(async move {
            let mut all: Vec<Note> = notes
                .read()
                .map_err(|_| Error::internal("notes lock poisoned"))?
                .values()
                .cloned()
                .collect();
            all.sort_by_key(|note| note.id);
            ctx.json_ok(all, "")
        })
    })
}

fn show_note(notes: Notes) -> impl Handler {
    handler_fn(move |ctx: &mut Context| {
        let notes = notes.clone();
        Box::pin(async move {
            let id = ctx.int_param("id")?;
            let note = notes
                .read()
                .map_err(|_| Error::internal("notes lock poisoned"))?
                .get(&id)
                .cloned();
            match note {
                Some(note) => ctx.json_ok(note, ""),
                None => ctx.json_not_found(format!("note {} does not exist", id)),
            }
        })
    })
}

fn create_note(notes: Notes) -> impl Handler {
    handler_fn(move |ctx: &mut Context| {
        let notes = notes.clone();
        Box::pin(async move {
            let title = match ctx.str_form("title") {
                Ok(title) => title,
                Err(err) => return ctx.json_bad_request(err.to_string()),
            };

            let mut store = notes
                .write()
                .map_err(|_| Error::internal("notes lock poisoned"))?;
            let id = store.keys().max().copied().unwrap_or(0) + 1;
            let note = Note { id, title };
            store.insert(id, note.clone());
            drop(store);

            ctx.json_created(note, "note created")
        })
    })
}

#[tokio::main]
async fn main() -> nex::Result<()> {
    let config = AppConfig::load()?;

    env_logger::Builder::new()
        .filter_level(config.logging.level_filter())
        .parse_default_env()
        .init();

    let notes: Notes = Arc::new(RwLock::new(HashMap::new()));

    let mut router = Router::with_config(&config.router);
    router
        .use_middleware(Logging::new())
        .use_middleware(RequestId::new())
        .use_middleware(Cors::with_config(config.cors.clone()))
        .use_middleware(Recovery::new());

    router.get("/", handler_fn(|ctx| Box::pin(hello(ctx))))?;

    {
        let mut api = router.group("/api/v1");
        api.get("/notes", list_notes(notes.clone()))?;
        api.post("/notes", create_note(notes.clone()))?;
        api.get("/notes/:id([0-9]+)", show_note(notes.clone()))?;
    }

    Server::from_config(router, &config.server)
        .serve(&config.server.address())
        .await
}
