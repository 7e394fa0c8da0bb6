#[cfg(test)]
mod tests {
    use hyper::{Method, StatusCode};
    use nex::prelude::*;
    use nex::{ParamError, ParamSource};

    async fn search(ctx: &mut Context) -> Result<()> {
        let category = ctx.str_param("category")?;
        let page = ctx.int_query_or("page", 1);
        let term = ctx.str_query_or("q", "");
        ctx.json_ok(
            json!({ "category": category, "page": page, "q": term }),
            "",
        )
    }

    #[tokio::test]
    async fn test_path_and_query_parameters() {
        let mut router = Router::new();
        router.get("/search/:category", handler_fn(|ctx| Box::pin(search(ctx)))).unwrap();

        let response = router
            .handle(Request::new(Method::GET, "/search/books?q=rust+async&page=3&page=9"))
            .await;
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["data"]["category"], "books");
        assert_eq!(body["data"]["page"], 3);
        assert_eq!(body["data"]["q"], "rust async");
    }

    #[test]
    fn test_typed_parameter_errors() {
        let ctx = Context::new(Request::new(Method::GET, "/x?limit=ten&flag=maybe"));

        match ctx.int_query("limit") {
            Err(ParamError::InvalidInt { name, .. }) => assert_eq!(name, "limit"),
            other => panic!("unexpected: {:?}", other),
        }
        let err = ctx.bool_query("flag").unwrap_err();
        assert_eq!(err.location(), ParamSource::Query);
        assert!(matches!(ctx.str_param("id"), Err(ParamError::Missing { .. })));

        let err: Error = ctx.uuid_query("missing").unwrap_err().into();
        assert_eq!(err.status_code(), 400);
    }

    async fn signup(ctx: &mut Context) -> Result<()> {
        let email = ctx.str_form("email")?;
        let age = ctx.int_form("age")?;
        let newsletter = ctx.bool_form("newsletter").unwrap_or(false);
        ctx.json_created(
            json!({ "email": email, "age": age, "newsletter": newsletter }),
            "registered",
        )
    }

    #[tokio::test]
    async fn test_form_body() {
        let mut router = Router::new();
        router.post("/signup", handler_fn(|ctx| Box::pin(signup(ctx)))).unwrap();

        let request = Request::new(Method::POST, "/signup")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("email=a%40b.test&age=31&newsletter=1");
        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::CREATED);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["data"]["email"], "a@b.test");
        assert_eq!(body["data"]["age"], 31);
        assert_eq!(body["data"]["newsletter"], true);

        let request = Request::new(Method::POST, "/signup").with_body("email=a%40b.test");
        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&response.body).contains("age"));
    }

    #[derive(Debug, Deserialize, Serialize)]
    struct Listing {
        title: String,
        price: f64,
        tags: Vec<String>,
    }

    async fn create_listing(ctx: &mut Context) -> Result<()> {
        let listing: Listing = ctx.bind_form()?;
        let colors = ctx.query_all("color").to_vec();
        let discount = ctx.float_query("discount").unwrap_or(0.0);
        let gift = ctx.has_form_field("gift");
        ctx.json_created(
            json!({ "listing": listing, "colors": colors, "discount": discount, "gift": gift }),
            "",
        )
    }

    #[tokio::test]
    async fn test_form_binding_behind_content_type_check() {
        let mut router = Router::new();
        router
            .add_route(
                Route::post("/listings", handler_fn(|ctx| Box::pin(create_listing(ctx))))
                    .with(ContentType::form()),
            )
            .unwrap();

        let request = Request::new(Method::POST, "/listings?color=red&color[]=blue&discount=0.1")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("title=Desk+lamp&price=24.5&tags=home&tags=light&gift=");
        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::CREATED);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["data"]["listing"]["title"], "Desk lamp");
        assert_eq!(body["data"]["listing"]["price"], 24.5);
        assert_eq!(body["data"]["listing"]["tags"], json!(["home", "light"]));
        assert_eq!(body["data"]["colors"], json!(["red", "blue"]));
        assert_eq!(body["data"]["discount"], 0.1);
        assert_eq!(body["data"]["gift"], true);

        let request = Request::new(Method::POST, "/listings")
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"title":"Desk lamp"}"#);
        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.body, b"Invalid Content-Type");
    }

    #[derive(Debug, Deserialize)]
    struct Order {
        id: u32,
        item: String,
    }

    async fn import_order(ctx: &mut Context) -> Result<()> {
        let order: Order = ctx.body_xml()?;
        ctx.text(200, format!("{}:{}", order.id, order.item))
    }

    #[tokio::test]
    async fn test_xml_body() {
        let mut router = Router::new();
        router.post("/orders", handler_fn(|ctx| Box::pin(import_order(ctx)))).unwrap();

        let request = Request::new(Method::POST, "/orders")
            .with_body("<Order><id>12</id><item>lamp</item></Order>");
        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, b"12:lamp");

        let request = Request::new(Method::POST, "/orders").with_body("<Order><id>");
        let response = router.handle(request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_envelope_helpers_through_router() {
        let mut router = Router::new();
        router
            .delete(
                "/items/:id",
                handler_fn(|ctx: &mut Context| Box::pin(async move { ctx.json_no_content() })),
            )
            .unwrap();
        router
            .put(
                "/items/:id",
                handler_fn(|ctx: &mut Context| {
                    Box::pin(async move { ctx.json_conflict("version mismatch") })
                }),
            )
            .unwrap();

        let response = router.handle(Request::new(Method::DELETE, "/items/1")).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(response.body.is_empty());

        let response = router.handle(Request::new(Method::PUT, "/items/1")).await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["status"], 409);
        assert_eq!(body["message"], "version mismatch");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_context_store_between_middleware_and_handler() {
        let mut router = Router::new();
        router.use_middleware(middleware_fn("tenant", |next: BoxedHandler| {
            let handler: BoxedHandler = Arc::new(handler_fn(move |ctx: &mut Context| {
                let next = next.clone();
                Box::pin(async move {
                    let tenant = ctx.header("x-tenant").unwrap_or("public").to_string();
                    ctx.set("tenant", tenant);
                    next.call(ctx).await
                })
            }));
            handler
        }));
        router
            .get(
                "/whoami",
                handler_fn(|ctx: &mut Context| {
                    Box::pin(async move {
                        let tenant = ctx.get::<String>("tenant").cloned().unwrap_or_default();
                        ctx.text(200, tenant)
                    })
                }),
            )
            .unwrap();

        let request = Request::new(Method::GET, "/whoami").with_header("X-Tenant", "acme");
        let response = router.handle(request).await;
        assert_eq!(response.body, b"acme");
    }
}
