use bridgekit_fs::{DownloadConfig, DownloadError, Downloader};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves one canned HTTP response and returns the base URL.
async fn serve_once(status: &'static str, body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0_u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}")
}

fn downloader(dir: &tempfile::TempDir) -> Downloader {
    Downloader::new(DownloadConfig::with_files_dir(dir.path().join("files"))).unwrap()
}

#[tokio::test]
async fn saves_body_under_last_segment() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve_once("200 OK", b"%PDF-1.7 hello").await;

    let path = downloader(&dir)
        .download(&format!("{base}/docs/manual.pdf"))
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("files").join("manual.pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 hello");
}

#[tokio::test]
async fn non_200_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve_once("404 Not Found", b"missing").await;

    let err = downloader(&dir)
        .download(&format!("{base}/gone.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Status(404)));
    assert!(!dir.path().join("files").join("gone.pdf").exists());
}

#[tokio::test]
async fn empty_body_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve_once("200 OK", b"").await;

    let err = downloader(&dir)
        .download(&format!("{base}/empty.bin"))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Empty));
}

#[tokio::test]
async fn invalid_url_never_hits_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let err = downloader(&dir).download("file:///etc/passwd").await.unwrap_err();
    assert!(matches!(err, DownloadError::InvalidUrl(_)));
}
