//! Static file and directory handlers

use http::header;
use quay_core::response::ResponseBuilder;
use quay_core::{Error, Handler, Request, RequestContext, Response, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Index document served for directory requests
const INDEX_FILE: &str = "index.html";

/// Handler serving a single file
pub fn file_handler(file: PathBuf) -> impl Handler + 'static {
    move |_req: Request| -> Result<Response> { serve_path(&file) }
}

/// Handler serving files below `root`, addressed by the wildcard remainder
pub fn dir_handler(root: PathBuf) -> impl Handler + 'static {
    move |req: Request| -> Result<Response> {
        let relative = RequestContext::of(&req)
            .and_then(|ctx| ctx.wildcard.as_deref())
            .unwrap_or("");

        let path = resolve(&root, relative)?;
        serve_path(&path)
    }
}

/// Join a request path onto `root`, rejecting anything that escapes it
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                tracing::warn!(path = %relative, "Rejected static path outside of root");
                return Err(Error::NotFound(relative.to_string()));
            }
        }
    }

    Ok(path)
}

fn serve_path(path: &Path) -> Result<Response> {
    let path = if path.is_dir() {
        path.join(INDEX_FILE)
    } else {
        path.to_path_buf()
    };

    let contents = match fs::read(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied => {
            return Err(Error::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    tracing::trace!(path = %path.display(), bytes = contents.len(), "Serving static file");

    ResponseBuilder::new(http::StatusCode::OK)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .bytes(mime.essence_str(), contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::fs;

    fn request_with_wildcard(rest: &str) -> Request {
        let mut req = http::Request::new(Bytes::new());
        let mut ctx = RequestContext::new("test");
        ctx.wildcard = Some(rest.to_string());
        req.extensions_mut().insert(ctx);
        req
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = Path::new("/srv/www");

        assert_eq!(resolve(root, "css/app.css").unwrap(), root.join("css/app.css"));
        assert_eq!(resolve(root, "./a.txt").unwrap(), root.join("a.txt"));
        assert!(resolve(root, "../etc/passwd").is_err());
        assert!(resolve(root, "css/../../secret").is_err());
        assert!(resolve(root, "/etc/passwd").is_err());
    }

    #[test]
    fn test_file_handler() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        fs::write(&file, "hello").unwrap();

        let handler = file_handler(file);
        let response = handler.call(http::Request::new(Bytes::new())).unwrap();

        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(response.body(), &Bytes::from("hello"));
    }

    #[test]
    fn test_dir_handler_index_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();

        let handler = dir_handler(dir.path().to_path_buf());

        let response = handler.call(request_with_wildcard("docs")).unwrap();
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/html");

        let missing = handler.call(request_with_wildcard("nope.css"));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
