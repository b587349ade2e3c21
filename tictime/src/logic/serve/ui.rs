use rust_embed::RustEmbed;
use warp::{http::Response, http::StatusCode, Filter, Rejection};

#[derive(RustEmbed)]
#[folder = "../tictime-ui/ui/dist"]
struct Asset;

/// Paths owned by the API and the socket; the SPA fallback must not shadow them
fn is_backend_path(path: &str) -> bool {
    path.starts_with("/api") || path.starts_with("/time/") || path == "/health"
}

/// Serves static assets under `/static/<path>` and falls back to `index.html` for SPA.
pub fn ui_routes() -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    // 1) static files
    let static_files = warp::get()
        .and(warp::path("static"))
        .and(warp::path::tail())
        .map(|tail: warp::path::Tail| {
            let path = tail.as_str();
            match Asset::get(path) {
                Some(content) => {
                    let mime = mime_guess::from_path(path).first_or_octet_stream();
                    Response::builder()
                        .header("content-type", mime.as_ref())
                        .body(content.data.into_owned())
                }
                None => Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(b"Not Found".to_vec()),
            }
        });

    // 2) SPA fallback - only for GET requests outside the backend paths
    let spa = warp::get()
        .and(warp::path::full())
        .and_then(|path: warp::path::FullPath| async move {
            if is_backend_path(path.as_str()) {
                Err(warp::reject::not_found())
            } else {
                Ok(())
            }
        })
        .map(|_| match Asset::get("index.html") {
            Some(file) => Response::builder()
                .header("content-type", "text/html; charset=utf-8")
                .body(file.data.into_owned()),
            None => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(b"index.html missing from embedded assets".to_vec()),
        });

    static_files.or(spa)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_paths_are_not_spa() {
        assert!(is_backend_path("/api/initial_state"));
        assert!(is_backend_path("/time/tic/"));
        assert!(is_backend_path("/health"));
        assert!(!is_backend_path("/"));
        assert!(!is_backend_path("/login"));
    }
}
