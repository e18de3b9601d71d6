// End-to-end behaviour of a site directory with _headers and _redirects files
#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use base64::{Engine as _, engine::general_purpose};
    use http_body_util::BodyExt;
    use jamgate::{
        FileSystemAdapter, HttpClientAdapter, HttpHandler, build_router,
        config::{ServerConfig, load_pipeline},
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    const HEADERS: &str = "\
# site wide
/*
  X-Frame-Options: DENY
  X-Test: site

/secret/*
  X-Test: secret
  Basic-Auth: foo:bar aaa:bbb

/assets/*
  Cache-Control: public
  Cache-Control: max-age=3600
";

    const REDIRECTS: &str = "\
# shadowing rules run before the file lookup
/shadowed.html    /target.html    302!
/a  id=:id        /b/:id          301!
/old.html         /new.html
/news/*           /blog/:splat    302
/posts/:year/:slug  /blog/:year/:slug  301
/store  id=:id    /items/:id      302
/store  page=:id  /pages/:id      302
/store            /catalog        302
/landing          /index.html     200
/*                /404.html       404
";

    async fn write(dir: &TempDir, path: &str, contents: &str) {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(full_path, contents).await.unwrap();
    }

    async fn site() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        write(&dir, "_headers", HEADERS).await;
        write(&dir, "_redirects", REDIRECTS).await;
        write(&dir, "index.html", "home").await;
        write(&dir, "shadowed.html", "never served").await;
        write(&dir, "old.html", "still here").await;
        write(&dir, "a", "file a").await;
        write(&dir, "404.html", "custom missing page").await;
        write(&dir, "secret/plans.txt", "plans").await;
        write(&dir, "assets/app.css", "body {}").await;
        write(&dir, "docs/index.html", "docs index").await;

        let config = ServerConfig::builder()
            .root(dir.path().to_str().unwrap())
            .build();
        let pipeline = load_pipeline(&config).await.unwrap();
        let handler = HttpHandler::new(
            Arc::new(pipeline),
            Arc::new(HttpClientAdapter::new().unwrap()),
            Arc::new(FileSystemAdapter::new()),
            config.root.clone(),
            &config.auth_realm,
        )
        .unwrap();

        (dir, build_router(Arc::new(handler)))
    }

    async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
        app.clone().oneshot(req).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response<Body>) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_static_file_gets_rule_headers() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/index.html")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["x-test"], "site");
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_string(response).await, "home");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_repeated_header_values_are_joined() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/assets/app.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=3600"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_basic_auth_gate() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/secret/plans.txt")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"Please enter your username and password for this site\""
        );
        assert_eq!(response.headers()["x-test"], "secret");
        assert_eq!(body_string(response).await, "Unauthorized.\n");

        for (user, pass, expected) in [
            ("foo", "bar", StatusCode::OK),
            ("aaa", "bbb", StatusCode::OK),
            ("foo", "bbb", StatusCode::UNAUTHORIZED),
        ] {
            let token = general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            let req = Request::builder()
                .uri("/secret/plans.txt")
                .header(header::AUTHORIZATION, format!("Basic {token}"))
                .body(Body::empty())
                .unwrap();
            let response = send(&app, req).await;
            assert_eq!(response.status(), expected, "credentials {user}:{pass}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shadowing_redirect_beats_existing_file() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/shadowed.html")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/target.html");
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_existing_file_beats_plain_redirect() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/old.html")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "still here");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_splat_and_placeholder_redirects() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/news/2024/launch")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/blog/2024/launch");
        assert_eq!(response.headers()["x-test"], "site");

        let response = send(&app, get("/posts/2017/hello")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), "/blog/2017/hello");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_rules_fall_through_in_order() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/store?id=42")).await;
        assert_eq!(location(&response), "/items/42");

        let response = send(&app, get("/store?page=7")).await;
        assert_eq!(location(&response), "/pages/7");

        let response = send(&app, get("/store?id=")).await;
        assert_eq!(location(&response), "/catalog");

        let response = send(&app, get("/store")).await;
        assert_eq!(location(&response), "/catalog");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_rule_without_its_query_serves_the_file() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/a")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::LOCATION));
        assert_eq!(body_string(response).await, "file a");

        let response = send(&app, get("/a?id=5")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), "/b/5");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_substituted_values_are_encoded_in_location() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/store?id=x%0Ay")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/items/x%0Ay");

        let response = send(&app, get("/posts/2017/hello%20world")).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), "/blog/2017/hello%20world");

        let response = send(&app, get("/news/what%3F")).await;
        assert_eq!(location(&response), "/blog/what%3F");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rule_files_are_not_served() {
        let (_dir, app) = site().await;

        for path in ["/_headers", "/_redirects", "/./_headers"] {
            let response = send(&app, get(path)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
            let body = body_string(response).await;
            assert!(!body.contains("Basic-Auth"), "{path}");
            assert_eq!(body, "custom missing page");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rewrite_serves_destination() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/landing")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "home");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_catch_all_custom_404() {
        let (_dir, app) = site().await;

        let response = send(&app, get("/does/not/exist")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-test"], "site");
        assert_eq!(body_string(response).await, "custom missing page");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_get_skips_plain_redirects() {
        let (_dir, app) = site().await;

        let req = Request::builder()
            .method("POST")
            .uri("/news/anything")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, req).await;
        // No GET-only rule applies, and nothing is on disk at that path
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "Not Found\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_directories_are_not_served() {
        let (_dir, app) = site().await;

        // Falls through to the catch-all rule
        let response = send(&app, get("/docs/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "custom missing page");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_percent_encoded_paths_match_rules() {
        let (dir, app) = site().await;
        write(&dir, "my page.html", "spaced").await;

        let response = send(&app, get("/my%20page.html")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "spaced");
    }
}
