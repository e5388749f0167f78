use ssr_page::{render_page, ClientStats, PageError, RenderParams, RouteTable};

fn collapse(html: &str) -> String {
    html.lines().map(str::trim).collect()
}

fn app() -> RouteTable {
    RouteTable::new()
        .route("/", "<div>Home</div>")
        .route("/docs", "<main><h1>Docs</h1></main>")
        .not_found("<div>Not found</div>")
}

#[tokio::test]
async fn test_home_route_document() {
    let stats = ClientStats::from_json(
        r#"{ "entrypoints": { "main": { "assets": ["/static/main.js"] } } }"#,
    )
    .unwrap();

    let html = render_page(&mut app(), RenderParams::new("/", &stats)).await.unwrap();

    assert_eq!(
        collapse(&html),
        r#"<html><body><div id="app"><div>Home</div></div><script src="/static/main.js"></script></body></html>"#
    );
}

#[tokio::test]
async fn test_one_script_per_asset_in_order() {
    let stats = ClientStats::with_main_assets(["/static/runtime.js", "/static/vendors.js", "/static/main.js"]);

    let html = render_page(&mut app(), RenderParams::new("/docs", &stats)).await.unwrap();

    let tags: Vec<&str> = html
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("<script"))
        .collect();
    assert_eq!(
        tags,
        vec![
            r#"<script src="/static/runtime.js"></script>"#,
            r#"<script src="/static/vendors.js"></script>"#,
            r#"<script src="/static/main.js"></script>"#,
        ]
    );
    assert_eq!(html.matches(r#"<div id="app"><main><h1>Docs</h1></main></div>"#).count(), 1);
}

#[tokio::test]
async fn test_empty_asset_list() {
    let stats = ClientStats::from_json(r#"{"entrypoints":{"main":{"assets":[]}}}"#).unwrap();

    let html = render_page(&mut app(), RenderParams::new("/", &stats)).await.unwrap();

    assert!(!html.contains("<script"));
    assert!(html.starts_with("<html>"));
}

#[tokio::test]
async fn test_unmatched_route_delegates_to_renderer() {
    let stats = ClientStats::with_main_assets(["/static/main.js"]);

    let html = render_page(&mut app(), RenderParams::new("/nowhere", &stats)).await.unwrap();

    assert!(html.contains(r#"<div id="app"><div>Not found</div></div>"#));
}

#[tokio::test]
async fn test_missing_main_entrypoint_is_an_error() {
    let stats = ClientStats::from_json(r#"{"entrypoints":{}}"#).unwrap();

    let err = render_page(&mut app(), RenderParams::new("/", &stats)).await.unwrap_err();

    assert!(matches!(err, PageError::MissingEntrypoint(_)));
    assert_eq!(err.to_string(), "entry point 'main' not found in client stats");
}

#[tokio::test]
async fn test_identical_inputs_identical_output() {
    let stats = ClientStats::with_main_assets(["/a.js", "/b.js"]);
    let mut renderer = app();

    let first = render_page(&mut renderer, RenderParams::new("/docs", &stats)).await.unwrap();
    let second = render_page(&mut renderer, RenderParams::new("/docs", &stats)).await.unwrap();

    assert_eq!(first, second);
}
